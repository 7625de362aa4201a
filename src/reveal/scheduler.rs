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

use super::pacing::{ObservedDelta, Pacing, estimate_next_chunk};
use super::repair::clean_truncated_link;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Callback fired with the repaired visible text after every reveal step.
pub type ContentShownFn = Box<dyn FnMut(&str)>;

/// Per-message reveal bookkeeping.
#[derive(Debug, Clone)]
pub struct RevealState {
    full_text: String,
    full_chars: usize,
    shown_chars: usize,
    shown_bytes: usize,
    stream_started_at: Instant,
    /// Characters present when the scheduler was created; only growth past
    /// this point counts toward the delivery rate.
    initial_chars: usize,
    observed: VecDeque<ObservedDelta>,
}

impl RevealState {
    fn new(now: Instant) -> Self {
        Self {
            full_text: String::new(),
            full_chars: 0,
            shown_chars: 0,
            shown_bytes: 0,
            stream_started_at: now,
            initial_chars: 0,
            observed: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    #[must_use]
    pub fn shown_chars(&self) -> usize {
        self.shown_chars
    }

    #[must_use]
    pub fn full_chars(&self) -> usize {
        self.full_chars
    }

    #[must_use]
    pub fn remaining_chars(&self) -> usize {
        self.full_chars - self.shown_chars
    }

    #[must_use]
    pub fn stream_started_at(&self) -> Instant {
        self.stream_started_at
    }

    #[must_use]
    pub fn observed_deltas(&self) -> &VecDeque<ObservedDelta> {
        &self.observed
    }

    /// Raw (unrepaired) visible prefix.
    #[must_use]
    pub fn shown_text(&self) -> &str {
        &self.full_text[..self.shown_bytes]
    }

    fn grown_chars(&self) -> usize {
        self.full_chars.saturating_sub(self.initial_chars)
    }

    fn advance(&mut self, chars: usize) {
        let add = chars.min(self.remaining_chars());
        let tail = &self.full_text[self.shown_bytes..];
        let bytes = tail.char_indices().nth(add).map_or(tail.len(), |(i, _)| i);
        self.shown_bytes += bytes;
        self.shown_chars += add;
    }

    fn reveal_all(&mut self) {
        self.shown_bytes = self.full_text.len();
        self.shown_chars = self.full_chars;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    Idle,
    Adaptive { estimate: Instant, last_frame: Instant },
    Fixed { next_step: Instant },
}

/// Reveals a growing buffer progressively, one frame at a time.
///
/// The host feeds the latest buffer through [`update`](Self::update) and
/// drives [`tick`](Self::tick) from its frame loop while
/// [`needs_frame`](Self::needs_frame) is true. The visible prefix never
/// shrinks while the buffer only grows, and it always reaches the full buffer
/// once streaming has ended.
pub struct RevealScheduler {
    state: RevealState,
    pacing: Pacing,
    streaming: bool,
    skip_to_end: bool,
    run: Run,
    finished: bool,
    visible: String,
    on_content_shown: Option<ContentShownFn>,
}

impl std::fmt::Debug for RevealScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealScheduler")
            .field("state", &self.state)
            .field("pacing", &self.pacing)
            .field("streaming", &self.streaming)
            .field("run", &self.run)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl RevealScheduler {
    /// Empty scheduler for a message that is about to stream.
    #[must_use]
    pub fn new(pacing: Pacing, now: Instant) -> Self {
        Self {
            state: RevealState::new(now),
            pacing,
            streaming: true,
            skip_to_end: false,
            run: Run::Idle,
            finished: false,
            visible: String::new(),
            on_content_shown: None,
        }
    }

    /// Scheduler for history: everything is visible at once and no frames
    /// are ever requested.
    #[must_use]
    pub fn settled(text: &str, pacing: Pacing, now: Instant) -> Self {
        let mut scheduler = Self::new(pacing, now);
        scheduler.state.full_text = text.to_owned();
        scheduler.state.full_chars = text.chars().count();
        scheduler.state.initial_chars = scheduler.state.full_chars;
        scheduler.state.reveal_all();
        scheduler.streaming = false;
        scheduler.finished = true;
        scheduler.visible = clean_truncated_link(text).into_owned();
        scheduler
    }

    #[must_use]
    pub fn with_content_shown(mut self, callback: impl FnMut(&str) + 'static) -> Self {
        self.on_content_shown = Some(Box::new(callback));
        self
    }

    pub fn set_content_shown(&mut self, callback: Option<ContentShownFn>) {
        self.on_content_shown = callback;
    }

    /// Feed the latest buffer. Growth re-arms the reveal loop.
    pub fn update(&mut self, full_text: &str, streaming: bool, now: Instant) {
        if full_text == self.state.full_text && streaming == self.streaming {
            return;
        }
        self.streaming = streaming;

        if full_text != self.state.full_text {
            self.replace_source(full_text, now);
        }

        if self.skip_to_end {
            self.fast_forward();
            return;
        }

        if self.state.remaining_chars() == 0 {
            self.run = Run::Idle;
            self.finished = !self.streaming;
            return;
        }

        self.finished = false;
        self.run = match &self.pacing {
            Pacing::Adaptive(config) => Run::Adaptive {
                estimate: estimate_next_chunk(
                    &self.state.observed,
                    config,
                    self.state.grown_chars(),
                    self.state.stream_started_at,
                    now,
                ),
                last_frame: now,
            },
            // An already-running interval keeps its phase.
            Pacing::FixedRate { .. } => match self.run {
                Run::Fixed { next_step } => Run::Fixed { next_step: next_step.min(now) },
                _ => Run::Fixed { next_step: now },
            },
        };
    }

    fn replace_source(&mut self, full_text: &str, now: Instant) {
        let state = &mut self.state;
        if let Some(suffix) = full_text.strip_prefix(state.full_text.as_str()) {
            if !suffix.is_empty() {
                state.observed.push_back(ObservedDelta { at: now, text: suffix.to_owned() });
                let keep = match &self.pacing {
                    Pacing::Adaptive(config) => config.delta_window.max(1),
                    Pacing::FixedRate { .. } => 1,
                };
                while state.observed.len() > keep {
                    state.observed.pop_front();
                }
            }
            state.full_chars += suffix.chars().count();
            state.full_text.push_str(suffix);
            return;
        }

        // Source was rewritten rather than extended. Keep as much of the
        // visible prefix as still fits and restart the delivery statistics.
        tracing::debug!(
            old_len = state.full_text.len(),
            new_len = full_text.len(),
            "reveal source replaced"
        );
        let keep_chars = state.shown_chars;
        *state = RevealState::new(now);
        state.full_text = full_text.to_owned();
        state.full_chars = full_text.chars().count();
        state.initial_chars = state.full_chars;
        state.advance(keep_chars);
        self.visible = clean_truncated_link(state.shown_text()).into_owned();
    }

    /// Advance by one frame. Returns true when the visible text changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.run {
            Run::Idle => false,
            Run::Adaptive { estimate, last_frame } => self.tick_adaptive(estimate, last_frame, now),
            Run::Fixed { next_step } => self.tick_fixed(next_step, now),
        }
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn tick_adaptive(&mut self, estimate: Instant, last_frame: Instant, now: Instant) -> bool {
        if now >= estimate {
            // Catch-up: the next chunk is due, so nothing may stay hidden.
            self.state.reveal_all();
            self.emit();
            self.settle_run();
            return true;
        }

        let frame_ms = now.saturating_duration_since(last_frame).as_secs_f64() * 1000.0;
        let window_ms = estimate.duration_since(now).as_secs_f64() * 1000.0;
        self.run = Run::Adaptive { estimate, last_frame: now };

        let remaining = self.state.remaining_chars();
        let add = ((remaining as f64 / window_ms) * frame_ms).round().max(0.0) as usize;
        if add == 0 {
            return false;
        }
        self.state.advance(add);
        self.emit();
        if self.state.remaining_chars() == 0 {
            self.settle_run();
        }
        true
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn tick_fixed(&mut self, mut next_step: Instant, now: Instant) -> bool {
        let Pacing::FixedRate { interval, throttle } = &self.pacing else {
            self.run = Run::Idle;
            return false;
        };
        let interval = (*interval).max(Duration::from_millis(1));
        let throttle = throttle.clone();

        let mut changed = false;
        while now >= next_step {
            let remaining = self.state.remaining_chars();
            if remaining == 0 {
                break;
            }
            let add = throttle
                .add_chars(interval, self.state.shown_chars, self.state.full_chars)
                .floor()
                .max(0.0) as usize;
            self.state.advance(add.min(remaining));
            self.emit();
            changed = true;
            next_step += interval;
        }

        if self.state.remaining_chars() == 0 {
            self.settle_run();
        } else {
            self.run = Run::Fixed { next_step };
        }
        changed
    }

    fn settle_run(&mut self) {
        self.run = Run::Idle;
        self.finished = !self.streaming;
    }

    /// Show the full buffer now and keep doing so for any later growth.
    pub fn fast_forward(&mut self) {
        self.skip_to_end = true;
        let changed = self.state.remaining_chars() > 0;
        self.state.reveal_all();
        if changed {
            self.emit();
        }
        self.settle_run();
    }

    fn emit(&mut self) {
        self.visible = clean_truncated_link(self.state.shown_text()).into_owned();
        if let Some(callback) = self.on_content_shown.as_mut() {
            callback(&self.visible);
        }
    }

    /// Visible text with any trailing half-written link repaired.
    #[must_use]
    pub fn visible_text(&self) -> &str {
        &self.visible
    }

    #[must_use]
    pub fn state(&self) -> &RevealState {
        &self.state
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// True while the reveal loop wants another frame.
    #[must_use]
    pub fn needs_frame(&self) -> bool {
        self.run != Run::Idle
    }

    /// Caught up with a buffer that is still streaming.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.run == Run::Idle && !self.finished
    }

    /// Streaming has ended and everything is visible.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
