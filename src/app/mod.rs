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

mod events;
pub mod feed;
mod state;

pub use events::handle_terminal_event;
pub use feed::FeedEvent;
pub use state::{App, AppOptions, AppStatus, FRAME_INTERVAL};

use crate::error::AppError;
use crate::model::ChatMessage;
use crossterm::event::EventStream;
use futures::{FutureExt as _, StreamExt};
use std::path::Path;
use std::time::Instant;

/// Read a JSON array of chat messages.
pub fn load_transcript(path: &Path) -> Result<Vec<ChatMessage>, AppError> {
    let text = std::fs::read_to_string(path).map_err(|err| {
        tracing::warn!(path = %path.display(), %err, "transcript unreadable");
        if err.kind() == std::io::ErrorKind::NotFound {
            AppError::TranscriptNotFound
        } else {
            AppError::InvalidTranscript
        }
    })?;
    serde_json::from_str(&text).map_err(|err| {
        tracing::warn!(path = %path.display(), %err, "transcript rejected");
        AppError::InvalidTranscript
    })
}

// ---------------------------------------------------------------------------
// TUI event loop
// ---------------------------------------------------------------------------

pub async fn run_tui(app: &mut App) -> anyhow::Result<()> {
    let mut terminal = ratatui::try_init().map_err(|err| {
        tracing::warn!(%err, "terminal init failed");
        AppError::TerminalUnavailable
    })?;

    // Mouse capture drives wheel scrolling and selection (ignore error on unsupported terminals)
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::EnableBracketedPaste,
        crossterm::event::EnableMouseCapture,
    );

    let mut events = EventStream::new();
    let mut last_render = Instant::now();

    let result: anyhow::Result<()> = loop {
        // Phase 1: wait for an event, or for the next frame while something animates
        let wake = app.next_frame_at(last_render);
        let deadline = tokio::time::Instant::from_std(wake.unwrap_or(last_render));
        tokio::select! {
            Some(Ok(event)) = events.next() => {
                handle_terminal_event(app, event, Instant::now());
            }
            Some(event) = app.feed_rx.recv() => {
                app.apply_feed_event(event);
            }
            () = tokio::time::sleep_until(deadline), if wake.is_some() => {}
        }

        // Phase 2: drain all remaining queued events (non-blocking)
        loop {
            if let Some(Some(Ok(event))) = events.next().now_or_never() {
                handle_terminal_event(app, event, Instant::now());
                continue;
            }
            match app.feed_rx.try_recv() {
                Ok(event) => app.apply_feed_event(event),
                Err(_) => break,
            }
        }

        if app.should_quit {
            break Ok(());
        }

        // Phase 3: render once
        if let Err(err) = terminal.draw(|f| crate::ui::render(f, app, Instant::now())) {
            break Err(err.into());
        }
        last_render = Instant::now();
    };

    app.cancel_response();

    // Restore terminal
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableBracketedPaste,
        crossterm::event::DisableMouseCapture,
    );
    ratatui::restore();

    result
}
