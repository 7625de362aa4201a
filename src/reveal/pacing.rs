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

//! Rate laws for revealing text.
//!
//! Two strategies: a fixed-interval throttle that speeds up when far behind,
//! and an adaptive estimator that times the reveal to finish exactly when the
//! next chunk is expected to arrive.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Upper bound on any chunk-arrival estimate, so a stalled source can't push
/// the catch-up point out indefinitely.
const MAX_CHUNK_WAIT: Duration = Duration::from_secs(60);

/// Decides how many characters to add after `delta` has elapsed, given
/// `shown` of `full` characters are visible.
pub trait Throttle {
    fn add_chars(&self, delta: Duration, shown: usize, full: usize) -> f64;
}

impl<F> Throttle for F
where
    F: Fn(Duration, usize, usize) -> f64,
{
    fn add_chars(&self, delta: Duration, shown: usize, full: usize) -> f64 {
        self(delta, shown, full)
    }
}

/// Fixed-interval pacing. Each step adds
/// `max(remaining / catch_up_window * interval, min_chars_per_sec * interval)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedRateConfig {
    pub interval_ms: u64,
    /// Time in which the whole backlog would drain at the proportional rate.
    pub catch_up_window_ms: u64,
    /// Floor rate when the backlog is small.
    pub min_chars_per_sec: f64,
}

impl Default for FixedRateConfig {
    fn default() -> Self {
        Self { interval_ms: 100, catch_up_window_ms: 700, min_chars_per_sec: 50.0 }
    }
}

impl FixedRateConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Characters guaranteed per step by the floor rate.
    #[must_use]
    pub fn min_chars_per_step(&self) -> usize {
        self.add_chars(self.interval(), 0, 0).floor().max(0.0) as usize
    }
}

impl Throttle for FixedRateConfig {
    #[allow(clippy::cast_precision_loss)]
    fn add_chars(&self, delta: Duration, shown: usize, full: usize) -> f64 {
        let delta_ms = delta.as_nanos() as f64 / 1e6;
        let remaining = full.saturating_sub(shown) as f64;
        let window = self.catch_up_window_ms.max(1) as f64;
        (remaining / window * delta_ms).max(self.min_chars_per_sec * delta_ms / 1000.0)
    }
}

/// Statistics-driven pacing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Assumed wait for the next chunk before any growth has been observed.
    pub fallback_chunk_wait_ms: u64,
    /// Number of recent deltas averaged for the chunk size.
    pub delta_window: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self { fallback_chunk_wait_ms: 1000, delta_window: 5 }
    }
}

impl AdaptiveConfig {
    #[must_use]
    pub fn fallback_wait(&self) -> Duration {
        Duration::from_millis(self.fallback_chunk_wait_ms)
    }
}

/// Which rate law a scheduler uses.
#[derive(Clone)]
pub enum Pacing {
    Adaptive(AdaptiveConfig),
    FixedRate { interval: Duration, throttle: Rc<dyn Throttle> },
}

impl Pacing {
    pub fn adaptive(config: AdaptiveConfig) -> Self {
        Self::Adaptive(config)
    }

    pub fn fixed(config: FixedRateConfig) -> Self {
        Self::FixedRate { interval: config.interval(), throttle: Rc::new(config) }
    }

    /// Fixed interval with a caller-supplied rate law.
    pub fn custom(interval: Duration, throttle: impl Throttle + 'static) -> Self {
        Self::FixedRate { interval, throttle: Rc::new(throttle) }
    }
}

impl std::fmt::Debug for Pacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adaptive(config) => f.debug_tuple("Adaptive").field(config).finish(),
            Self::FixedRate { interval, .. } => {
                f.debug_struct("FixedRate").field("interval", interval).finish_non_exhaustive()
            }
        }
    }
}

/// One observed growth of the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedDelta {
    pub at: Instant,
    pub text: String,
}

impl ObservedDelta {
    fn chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// When the next chunk is expected, from the recent chunk sizes and the
/// average delivery rate since the stream started.
///
/// Falls back to `now + fallback_wait` before any delta is observed or when
/// the rate can't be computed.
#[allow(clippy::cast_precision_loss)]
pub fn estimate_next_chunk(
    history: &VecDeque<ObservedDelta>,
    config: &AdaptiveConfig,
    grown_chars: usize,
    stream_started_at: Instant,
    now: Instant,
) -> Instant {
    let fallback = now + config.fallback_wait();
    let window = config.delta_window.max(1);
    let recent = history.len().min(window);
    if recent == 0 {
        return fallback;
    }

    let total: usize = history.iter().rev().take(recent).map(ObservedDelta::chars).sum();
    let avg_chunk = total as f64 / recent as f64;
    let elapsed_ms = now.saturating_duration_since(stream_started_at).as_secs_f64() * 1000.0;
    let chars_per_ms = grown_chars as f64 / elapsed_ms;
    if !chars_per_ms.is_finite() || chars_per_ms <= 0.0 {
        return fallback;
    }

    match Duration::try_from_secs_f64(avg_chunk / chars_per_ms / 1000.0) {
        Ok(wait) => now + wait.min(MAX_CHUNK_WAIT),
        Err(_) => fallback,
    }
}
