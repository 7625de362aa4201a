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

//! The surface a sticky-scroll controller drives.
//!
//! All positions are in the host's scroll units (pixels for a document,
//! 16px rows for the terminal host) measured from the top of the scroll
//! context.

use std::collections::VecDeque;

/// Geometry of the content region and the visible viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportBounds {
    pub content_top: f64,
    pub content_bottom: f64,
    pub viewport_top: f64,
    pub viewport_bottom: f64,
    pub max_scroll_offset: f64,
}

impl ViewportBounds {
    /// How far the content extends below the viewport. Negative when the
    /// content ends above the viewport bottom.
    #[must_use]
    pub fn distance_to_bottom(&self) -> f64 {
        self.content_bottom - self.viewport_bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Scroll,
    Wheel,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    /// The scroll offset changed, whoever caused it.
    Scroll,
    /// Raw wheel input; negative `delta_y` is upward.
    Wheel { delta_y: f64 },
    /// The content box changed height.
    Resize { content_height: f64 },
    /// The scroll container itself changed size.
    ContainerResize,
}

impl ViewportEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Scroll => EventKind::Scroll,
            Self::Wheel { .. } => EventKind::Wheel,
            Self::Resize { .. } | Self::ContainerResize => EventKind::Resize,
        }
    }
}

/// Handle returned by [`ScrollHost::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(pub u64);

/// Capabilities the controller needs from a scrollable surface.
///
/// Measurements return `None` while the surface is not laid out; callers
/// treat that as "try again later".
pub trait ScrollHost {
    fn bounds(&self) -> Option<ViewportBounds>;
    fn scroll_offset(&self) -> Option<f64>;
    fn scroll_to(&mut self, offset: f64);
    fn subscribe(&mut self, kind: EventKind) -> Subscription;
    fn unsubscribe(&mut self, subscription: Subscription);
    /// Next queued event for any subscribed kind.
    fn poll_event(&mut self) -> Option<ViewportEvent>;
}

/// In-memory scroll surface: one content box inside one scroll container.
///
/// Events are only queued for kinds that have at least one subscriber, so a
/// dropped controller leaves nothing behind.
#[derive(Debug, Default)]
pub struct VirtualViewport {
    content_height: f64,
    viewport_height: f64,
    offset: f64,
    detached: bool,
    next_subscription: u64,
    subscriptions: Vec<(Subscription, EventKind)>,
    queue: VecDeque<ViewportEvent>,
    programmatic_writes: u64,
}

impl VirtualViewport {
    #[must_use]
    pub fn new(viewport_height: f64) -> Self {
        Self { viewport_height: viewport_height.max(0.0), ..Self::default() }
    }

    #[must_use]
    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    #[must_use]
    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[must_use]
    pub fn max_offset(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    /// Number of `scroll_to` calls received from the controller.
    #[must_use]
    pub fn programmatic_writes(&self) -> u64 {
        self.programmatic_writes
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Simulate the surface being removed from (or returned to) layout.
    pub fn set_detached(&mut self, detached: bool) {
        self.detached = detached;
    }

    pub fn set_content_height(&mut self, height: f64) {
        let height = height.max(0.0);
        if (height - self.content_height).abs() < f64::EPSILON {
            return;
        }
        self.content_height = height;
        self.emit(ViewportEvent::Resize { content_height: height });
        self.clamp_offset();
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        let height = height.max(0.0);
        if (height - self.viewport_height).abs() < f64::EPSILON {
            return;
        }
        self.viewport_height = height;
        self.emit(ViewportEvent::ContainerResize);
        self.clamp_offset();
    }

    /// User-driven scroll to an absolute offset.
    pub fn user_scroll_to(&mut self, offset: f64) {
        self.set_offset(offset);
    }

    /// User wheel input: a wheel event followed by the scroll it causes.
    pub fn user_wheel(&mut self, delta_y: f64) {
        self.emit(ViewportEvent::Wheel { delta_y });
        self.set_offset(self.offset + delta_y);
    }

    fn clamp_offset(&mut self) {
        let max = self.max_offset();
        if self.offset > max {
            self.set_offset(max);
        }
    }

    fn set_offset(&mut self, offset: f64) {
        let clamped = offset.clamp(0.0, self.max_offset());
        if (clamped - self.offset).abs() < f64::EPSILON {
            return;
        }
        self.offset = clamped;
        self.emit(ViewportEvent::Scroll);
    }

    fn emit(&mut self, event: ViewportEvent) {
        if self.subscriptions.iter().any(|(_, kind)| *kind == event.kind()) {
            self.queue.push_back(event);
        }
    }
}

impl ScrollHost for VirtualViewport {
    fn bounds(&self) -> Option<ViewportBounds> {
        if self.detached {
            return None;
        }
        Some(ViewportBounds {
            content_top: 0.0,
            content_bottom: self.content_height,
            viewport_top: self.offset,
            viewport_bottom: self.offset + self.viewport_height,
            max_scroll_offset: self.max_offset(),
        })
    }

    fn scroll_offset(&self) -> Option<f64> {
        (!self.detached).then_some(self.offset)
    }

    fn scroll_to(&mut self, offset: f64) {
        self.programmatic_writes += 1;
        self.set_offset(offset);
    }

    fn subscribe(&mut self, kind: EventKind) -> Subscription {
        self.next_subscription += 1;
        let subscription = Subscription(self.next_subscription);
        self.subscriptions.push((subscription, kind));
        subscription
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscriptions.retain(|(s, _)| *s != subscription);
        let live: Vec<EventKind> = self.subscriptions.iter().map(|(_, kind)| *kind).collect();
        self.queue.retain(|event| live.contains(&event.kind()));
    }

    fn poll_event(&mut self) -> Option<ViewportEvent> {
        self.queue.pop_front()
    }
}
