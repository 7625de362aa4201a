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

//! Terminal rows exposed to the scroll controller as a pixel surface.

use crate::scroll::{EventKind, ScrollHost, Subscription, ViewportBounds, ViewportEvent, VirtualViewport};

/// Height of one terminal row in scroll units.
pub const ROW_PX: f64 = 16.0;

/// A chat body measured in terminal rows. The controller sees `ROW_PX` units
/// per row so its thresholds keep their pixel meaning.
#[derive(Debug, Default)]
pub struct TerminalViewport {
    surface: VirtualViewport,
}

impl TerminalViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply this frame's layout. Changes are reported to subscribers as
    /// resize events.
    pub fn set_rows(&mut self, content_rows: usize, viewport_rows: u16) {
        self.surface.set_viewport_height(f64::from(viewport_rows) * ROW_PX);
        self.surface.set_content_height(rows_to_px(content_rows));
    }

    pub fn content_rows(&self) -> usize {
        px_to_rows(self.surface.content_height())
    }

    pub fn viewport_rows(&self) -> usize {
        px_to_rows(self.surface.viewport_height())
    }

    /// First visible content row.
    pub fn offset_rows(&self) -> usize {
        px_to_rows(self.surface.offset())
    }

    pub fn max_offset_rows(&self) -> usize {
        px_to_rows(self.surface.max_offset())
    }

    /// Scroll by whole rows; negative is up.
    pub fn user_scroll_rows(&mut self, rows: i32) {
        self.surface.user_wheel(f64::from(rows) * ROW_PX);
    }

    /// Content coordinate of a row inside the visible body.
    pub fn content_y(&self, visible_row: u16) -> f64 {
        self.surface.offset() + f64::from(visible_row) * ROW_PX
    }

    pub fn surface(&self) -> &VirtualViewport {
        &self.surface
    }
}

#[allow(clippy::cast_precision_loss)]
fn rows_to_px(rows: usize) -> f64 {
    rows as f64 * ROW_PX
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn px_to_rows(px: f64) -> usize {
    (px / ROW_PX).round().max(0.0) as usize
}

impl ScrollHost for TerminalViewport {
    fn bounds(&self) -> Option<ViewportBounds> {
        self.surface.bounds()
    }

    fn scroll_offset(&self) -> Option<f64> {
        self.surface.scroll_offset()
    }

    fn scroll_to(&mut self, offset: f64) {
        self.surface.scroll_to(offset);
    }

    fn subscribe(&mut self, kind: EventKind) -> Subscription {
        self.surface.subscribe(kind)
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.surface.unsubscribe(subscription);
    }

    fn poll_event(&mut self) -> Option<ViewportEvent> {
        self.surface.poll_event()
    }
}
