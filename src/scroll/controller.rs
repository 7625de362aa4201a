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

use super::host::{EventKind, ScrollHost, Subscription, ViewportBounds, ViewportEvent};
use super::pointer::PointerState;
use super::spring::{SpringConfig, SpringDriver, SpringStep};
use super::timers::TimerQueue;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Tuning for [`StickyScroll`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickyConfig {
    /// Max distance from content bottom to viewport bottom that still counts
    /// as "at bottom" (inclusive).
    pub near_bottom_threshold: f64,
    /// Upward movement at or below this is not treated as user intent.
    pub scroll_noise: f64,
    /// Delay before the first pin attempt after mounting.
    pub settle_delay_ms: u64,
    /// Delay between a scroll event and its intent check, so a resize
    /// reported after the scroll can still suppress it.
    pub scroll_check_delay_ms: u64,
    /// How long a resize keeps suppressing scroll intent checks.
    pub resize_settle_ms: u64,
    pub spring: SpringConfig,
}

impl Default for StickyConfig {
    fn default() -> Self {
        Self {
            near_bottom_threshold: 70.0,
            scroll_noise: 2.0,
            settle_delay_ms: 500,
            scroll_check_delay_ms: 1,
            resize_settle_ms: 17,
            spring: SpringConfig::default(),
        }
    }
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollAnchorState {
    /// Pinned (auto-follow) vs free. Consulted before every programmatic scroll.
    pub is_at_bottom: bool,
    pub target_scroll_offset: f64,
    pub velocity: f64,
    /// Offset of the last programmatic write, consumed by the next scroll event.
    pub ignored_scroll_echo: Option<f64>,
    /// Height change of the most recent resize; non-zero suppresses intent checks.
    pub resize_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Timer {
    Settle,
    /// `moved` is the upward distance since the previous offset.
    ScrollCheck { offset: f64, echo: Option<f64>, moved: f64 },
    ClearResize { delta: f64 },
}

fn same_offset(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.5
}

/// Keeps a viewport pinned to the bottom of growing content unless the user
/// has scrolled or selected their way out.
///
/// The host's events are drained with [`pump`](Self::pump) and time advances
/// through [`tick`](Self::tick); both should run once per frame while
/// [`needs_frame`](Self::needs_frame) is true, after layout for the frame has
/// been committed to the host.
#[derive(Debug)]
pub struct StickyScroll<H: ScrollHost> {
    host: H,
    pointer: PointerState,
    config: StickyConfig,
    anchor: ScrollAnchorState,
    spring: SpringDriver,
    timers: TimerQueue<Timer>,
    subscriptions: Vec<Subscription>,
    last_scroll_offset: Option<f64>,
    /// Where the controller last put the viewport, or took it over.
    owned_offset: Option<f64>,
    previous_height: Option<f64>,
    last_content_bottom: Option<f64>,
    mounted: bool,
}

impl<H: ScrollHost> StickyScroll<H> {
    pub fn new(host: H, pointer: PointerState, config: StickyConfig) -> Self {
        Self {
            host,
            pointer,
            spring: SpringDriver::new(config.spring),
            config,
            anchor: ScrollAnchorState::default(),
            timers: TimerQueue::new(),
            subscriptions: Vec::new(),
            last_scroll_offset: None,
            owned_offset: None,
            previous_height: None,
            last_content_bottom: None,
            mounted: false,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn config(&self) -> &StickyConfig {
        &self.config
    }

    pub fn anchor(&self) -> &ScrollAnchorState {
        &self.anchor
    }

    pub fn is_at_bottom(&self) -> bool {
        self.anchor.is_at_bottom
    }

    pub fn is_animating(&self) -> bool {
        self.spring.is_running()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Spring in flight or timers pending.
    pub fn needs_frame(&self) -> bool {
        self.spring.is_running() || !self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Start listening to the host and schedule the initial pin attempt.
    pub fn mount(&mut self, now: Instant) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        for kind in [EventKind::Scroll, EventKind::Wheel, EventKind::Resize] {
            self.subscriptions.push(self.host.subscribe(kind));
        }
        self.previous_height = self.host.bounds().map(|b| b.content_bottom - b.content_top);
        self.last_content_bottom = self.host.bounds().map(|b| b.content_bottom);
        self.owned_offset = self.host.scroll_offset();
        self.timers.schedule(now + Duration::from_millis(self.config.settle_delay_ms), Timer::Settle);
        self.handle_scroll(now);
        tracing::debug!("sticky scroll mounted");
    }

    /// Cancel the animation and all timers and drop every host subscription.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.timers.clear();
        self.stop_spring();
        for subscription in self.subscriptions.drain(..) {
            self.host.unsubscribe(subscription);
        }
        tracing::debug!("sticky scroll unmounted");
    }

    /// Drain and handle every queued host event.
    pub fn pump(&mut self, now: Instant) {
        while let Some(event) = self.host.poll_event() {
            self.handle_event(event, now);
        }
    }

    pub fn handle_event(&mut self, event: ViewportEvent, now: Instant) {
        if !self.mounted {
            return;
        }
        match event {
            ViewportEvent::Scroll => self.handle_scroll(now),
            ViewportEvent::Wheel { delta_y } => {
                if delta_y < 0.0 {
                    self.stop_spring();
                }
            }
            ViewportEvent::Resize { content_height } => self.handle_resize(content_height, now),
            ViewportEvent::ContainerResize => {
                if self.anchor.is_at_bottom {
                    self.animate_to_bottom();
                }
            }
        }
    }

    /// Fire due timers and advance the spring by one frame.
    pub fn tick(&mut self, now: Instant) {
        if !self.mounted {
            return;
        }
        while let Some(timer) = self.timers.pop_due(now) {
            self.fire(timer);
        }
        self.step_spring(now);
    }

    /// A reveal step made new content visible.
    pub fn on_content_shown(&mut self) {
        if !self.mounted {
            return;
        }
        if self.is_selecting() {
            self.set_pinned(false, "selecting");
            self.stop_spring();
            return;
        }
        let Some(bounds) = self.host.bounds() else {
            return;
        };
        let growth = self
            .last_content_bottom
            .map_or(0.0, |previous| (bounds.content_bottom - previous).max(0.0));
        self.last_content_bottom = Some(bounds.content_bottom);
        if !self.anchor.is_at_bottom {
            return;
        }
        // Already far from the bottom before this growth, and not because the
        // spring is still on its way there.
        if (!self.spring.is_running() || self.moved_off_owned_offset())
            && bounds.distance_to_bottom() - growth > self.config.near_bottom_threshold
        {
            self.set_pinned(false, "away from bottom on reveal");
            self.stop_spring();
            return;
        }
        self.animate_to_bottom();
    }

    /// Re-pin and animate to the bottom regardless of the current state.
    pub fn scroll_to_bottom(&mut self) {
        self.set_pinned(true, "scroll to bottom requested");
        self.animate_to_bottom();
    }

    pub fn is_selecting(&self) -> bool {
        if !self.pointer.is_mouse_down() {
            return false;
        }
        self.host
            .bounds()
            .is_some_and(|b| self.pointer.is_selecting_within(b.content_top, b.content_bottom))
    }

    pub fn distance_to_bottom(&self) -> Option<f64> {
        self.host.bounds().as_ref().map(ViewportBounds::distance_to_bottom)
    }

    pub fn is_near_bottom(&self) -> bool {
        self.distance_to_bottom().is_some_and(|d| d <= self.config.near_bottom_threshold)
    }

    fn target_offset(&self) -> Option<f64> {
        let bounds = self.host.bounds()?;
        let offset = self.host.scroll_offset()?;
        Some((offset + bounds.distance_to_bottom()).clamp(0.0, bounds.max_scroll_offset.max(0.0)))
    }

    /// The viewport sits above the last offset the controller owned.
    fn moved_off_owned_offset(&self) -> bool {
        self.host
            .scroll_offset()
            .zip(self.owned_offset)
            .is_some_and(|(offset, owned)| offset < owned - self.config.scroll_noise)
    }

    fn set_pinned(&mut self, pinned: bool, reason: &'static str) {
        if self.anchor.is_at_bottom != pinned {
            tracing::debug!(pinned, reason, "sticky scroll state changed");
        }
        if pinned {
            self.owned_offset = self.host.scroll_offset();
        }
        self.anchor.is_at_bottom = pinned;
    }

    fn animate_to_bottom(&mut self) {
        let Some(target) = self.target_offset() else {
            return;
        };
        if !self.spring.is_running() {
            tracing::debug!(target, "spring started");
        }
        self.anchor.target_scroll_offset = target;
        self.spring.start();
    }

    fn stop_spring(&mut self) {
        if self.spring.is_running() {
            tracing::debug!("spring stopped");
        }
        self.spring.stop();
        self.anchor.velocity = 0.0;
    }

    fn handle_scroll(&mut self, now: Instant) {
        let Some(offset) = self.host.scroll_offset() else {
            return;
        };
        let echo = self.anchor.ignored_scroll_echo.take();
        let mut last = self.last_scroll_offset.unwrap_or(offset);
        self.last_scroll_offset = Some(offset);

        // A user scroll can land in the same event as our own write; compare
        // against where we put it.
        if let Some(echo) = echo
            && echo > offset
        {
            last = echo;
        }

        self.timers.schedule(
            now + Duration::from_millis(self.config.scroll_check_delay_ms),
            Timer::ScrollCheck { offset, echo, moved: last - offset },
        );
    }

    fn check_scroll(&mut self, offset: f64, echo: Option<f64>, moved: f64) {
        if echo.is_some_and(|e| same_offset(e, offset)) {
            return;
        }
        // A resize only accounts for a jump as large as itself.
        let resize = self.anchor.resize_delta.abs();
        if resize > f64::EPSILON && moved <= resize + self.config.scroll_noise {
            return;
        }
        let scrolling_up = moved > self.config.scroll_noise;
        if self.is_selecting() {
            self.set_pinned(false, "selecting");
            self.stop_spring();
            return;
        }
        if scrolling_up {
            self.set_pinned(false, "scrolled up");
            self.stop_spring();
            return;
        }
        if self.is_near_bottom() {
            self.set_pinned(true, "scrolled near bottom");
        }
    }

    fn handle_resize(&mut self, content_height: f64, now: Instant) {
        let difference = content_height - self.previous_height.unwrap_or(content_height);
        self.anchor.resize_delta = difference;

        if difference < 0.0 && self.is_near_bottom() {
            self.set_pinned(true, "content shrank near bottom");
        }
        if self.anchor.is_at_bottom {
            self.animate_to_bottom();
        }
        self.previous_height = Some(content_height);
        self.timers.schedule(
            now + Duration::from_millis(self.config.resize_settle_ms),
            Timer::ClearResize { delta: difference },
        );
    }

    fn fire(&mut self, timer: Timer) {
        match timer {
            Timer::Settle => {
                if self.is_near_bottom() {
                    self.set_pinned(true, "settled near bottom");
                    self.animate_to_bottom();
                }
            }
            Timer::ScrollCheck { offset, echo, moved } => {
                self.check_scroll(offset, echo, moved);
            }
            Timer::ClearResize { delta } => {
                if (self.anchor.resize_delta - delta).abs() < f64::EPSILON {
                    self.anchor.resize_delta = 0.0;
                }
            }
        }
    }

    fn step_spring(&mut self, now: Instant) {
        if !self.spring.is_running() {
            return;
        }
        if self.is_selecting() {
            self.stop_spring();
            return;
        }
        let (Some(current), Some(target)) = (self.host.scroll_offset(), self.target_offset()) else {
            return;
        };
        self.anchor.target_scroll_offset = target;

        match self.spring.step(current, target, now) {
            Some(SpringStep::Move(next)) => {
                self.anchor.velocity = self.spring.velocity();
                self.write_offset(next, current, target);
            }
            Some(SpringStep::Settle(at)) => {
                self.anchor.velocity = 0.0;
                tracing::debug!(offset = at, "spring settled");
                self.write_offset(at, current, target);
            }
            None => {}
        }
    }

    /// Programmatic scroll. Records the written value as the expected echo.
    fn write_offset(&mut self, value: f64, current: f64, target: f64) {
        let max = self.host.bounds().map_or(value, |b| b.max_scroll_offset.max(0.0));
        let mut offset = value.round().clamp(0.0, max);
        // Sub-pixel steps would round back to the current offset forever.
        if same_offset(offset, current.round()) && (target - current).abs() >= 1.0 {
            offset = (current + (target - current).signum()).round().clamp(0.0, max);
        }
        self.anchor.ignored_scroll_echo = Some(offset);
        self.owned_offset = Some(offset);
        self.host.scroll_to(offset);
    }
}

impl<H: ScrollHost> Drop for StickyScroll<H> {
    fn drop(&mut self) {
        self.unmount();
    }
}
