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

use std::cell::Cell;
use std::rc::Rc;

/// A text selection as a vertical span in scroll-context coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionSpan {
    pub start: f64,
    pub end: f64,
}

impl SelectionSpan {
    /// Span with `start <= end` regardless of drag direction.
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self { start: a.min(b), end: a.max(b) }
    }

    #[must_use]
    pub fn overlaps(&self, top: f64, bottom: f64) -> bool {
        self.start <= bottom && self.end >= top
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Snapshot {
    mouse_down: bool,
    selection: Option<SelectionSpan>,
}

/// Shared mouse and selection state.
///
/// One instance is created by the input layer and cloned into every
/// controller; clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    inner: Rc<Cell<Snapshot>>,
}

impl PointerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self) {
        self.update(|s| s.mouse_down = true);
    }

    /// Button released or click completed.
    pub fn release(&self) {
        self.update(|s| s.mouse_down = false);
    }

    pub fn select(&self, span: SelectionSpan) {
        self.update(|s| s.selection = Some(span));
    }

    pub fn clear_selection(&self) {
        self.update(|s| s.selection = None);
    }

    #[must_use]
    pub fn is_mouse_down(&self) -> bool {
        self.inner.get().mouse_down
    }

    #[must_use]
    pub fn selection(&self) -> Option<SelectionSpan> {
        self.inner.get().selection
    }

    /// Mouse held with a selection touching `[top, bottom]`.
    #[must_use]
    pub fn is_selecting_within(&self, top: f64, bottom: f64) -> bool {
        let snapshot = self.inner.get();
        snapshot.mouse_down && snapshot.selection.is_some_and(|span| span.overlaps(top, bottom))
    }

    fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        let mut snapshot = self.inner.get();
        f(&mut snapshot);
        self.inner.set(snapshot);
    }
}
