// convo_kit — Sticky-scroll and streaming reveal engines for chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use super::feed::{DemoBackend, FeedEvent};
use crate::config::KitConfig;
use crate::layout::RevealMode;
use crate::model::ChatMessage;
use crate::scroll::PointerState;
use crate::stream::{CommittedMessage, StreamedItem};
use crate::ui::ChatView;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Redraw cadence while anything is animating.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppStatus {
    Ready,
    /// A response body is being read.
    Streaming,
}

/// Options the binary passes through from the command line.
#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    pub mode: RevealMode,
    pub fast_forward: bool,
    pub chunk_delay: Duration,
}

pub struct App {
    /// Current transcript. Replaced (never mutated) so grouping can be
    /// memoized on the `Rc`.
    pub messages: Rc<[ChatMessage]>,
    /// Storage key of each message, parallel to `messages`.
    keys: Vec<String>,
    pub status: AppStatus,
    pub chat: ChatView,
    pub pointer: PointerState,
    pub input: String,
    pub should_quit: bool,
    /// Content coordinate where the current mouse drag started.
    pub drag_anchor: Option<f64>,
    pub last_error: Option<String>,
    pub backend: Rc<DemoBackend>,
    pub feed_tx: mpsc::UnboundedSender<FeedEvent>,
    pub feed_rx: mpsc::UnboundedReceiver<FeedEvent>,
    cancel: Option<CancellationToken>,
}

impl App {
    pub fn new(config: &KitConfig, options: AppOptions, transcript: Vec<ChatMessage>, now: Instant) -> Self {
        let pointer = PointerState::new();
        let backend = Rc::new(DemoBackend::new(options.chunk_delay));
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let mut app = Self {
            messages: Rc::from(Vec::new()),
            keys: Vec::new(),
            status: AppStatus::Ready,
            chat: ChatView::new(config, options.mode, pointer.clone(), options.fast_forward, now),
            pointer,
            input: String::new(),
            should_quit: false,
            drag_anchor: None,
            last_error: None,
            backend,
            feed_tx,
            feed_rx,
            cancel: None,
        };
        for msg in transcript {
            let entry = CommittedMessage::new(msg, ());
            app.backend.store.push(entry.clone());
            app.upsert(entry.key, entry.msg);
        }
        app
    }

    pub fn is_streaming(&self) -> bool {
        self.status == AppStatus::Streaming
    }

    /// Deadline for the next unprompted redraw; `None` while the screen is
    /// at rest and only input or the feed can change it.
    pub fn next_frame_at(&self, last_frame: Instant) -> Option<Instant> {
        if self.is_streaming() {
            // spinner
            return Some(last_frame + FRAME_INTERVAL);
        }
        self.chat.next_frame_at(last_frame, FRAME_INTERVAL)
    }

    /// Insert a message, or replace the one already stored under `key`.
    pub fn upsert(&mut self, key: String, msg: ChatMessage) {
        let mut messages = self.messages.to_vec();
        if let Some(pos) = self.keys.iter().position(|k| *k == key) {
            messages[pos] = msg;
        } else {
            self.keys.push(key);
            messages.push(msg);
        }
        self.messages = messages.into();
    }

    /// Commit the input line as a user message and start a response.
    pub fn submit(&mut self) {
        let text = self.input.trim().to_owned();
        if text.is_empty() || self.is_streaming() {
            return;
        }
        self.input.clear();
        self.last_error = None;

        let entry = CommittedMessage::new(ChatMessage::user_text(text), ());
        self.backend.store.push(entry.clone());
        self.upsert(entry.key, entry.msg);
        self.chat.scroll_to_bottom();

        let cancel = CancellationToken::new();
        super::feed::start_response(&self.backend, self.feed_tx.clone(), cancel.clone());
        self.cancel = Some(cancel);
        self.status = AppStatus::Streaming;
        tracing::info!(messages = self.messages.len(), "response requested");
    }

    /// Stop reading the current response. The backend still finishes and
    /// commits it.
    pub fn cancel_response(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    pub fn apply_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Item(StreamedItem::Msg { key, msg, committed, .. }) => {
                tracing::debug!(role = ?msg.role(), committed, "message received");
                self.upsert(key, msg);
            }
            FeedEvent::Item(StreamedItem::Done) => self.finish(),
            FeedEvent::Item(StreamedItem::Error { error }) => {
                self.last_error = Some(error);
                self.finish();
            }
            FeedEvent::Failed(error) => {
                self.last_error = Some(error);
                self.finish();
            }
            FeedEvent::Cancelled => {
                self.last_error = Some("Cancelled".to_owned());
                self.finish();
            }
            FeedEvent::Closed => {
                if self.is_streaming() {
                    self.finish();
                }
            }
        }
    }

    fn finish(&mut self) {
        self.status = AppStatus::Ready;
        self.cancel = None;
    }
}
