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

//! Bottom-pinned auto-scroll with a spring-damper animation.

mod controller;
mod host;
mod pointer;
mod spring;
mod timers;

pub use controller::{ScrollAnchorState, StickyConfig, StickyScroll};
pub use host::{EventKind, ScrollHost, Subscription, ViewportBounds, ViewportEvent, VirtualViewport};
pub use pointer::{PointerState, SelectionSpan};
pub use spring::{FRAME, REST_THRESHOLD, SpringConfig, SpringDriver, SpringStep};
pub use timers::TimerQueue;
