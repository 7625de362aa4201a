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

//! Progressive reveal of streamed assistant text.

mod pacing;
mod repair;
mod scheduler;

pub use pacing::{
    AdaptiveConfig, FixedRateConfig, ObservedDelta, Pacing, Throttle, estimate_next_chunk,
};
pub use repair::{REPAIR_WINDOW_CHARS, clean_truncated_link};
pub use scheduler::{ContentShownFn, RevealScheduler, RevealState};
