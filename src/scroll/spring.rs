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

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Nominal frame length; velocities are expressed per frame of this size.
pub const FRAME: Duration = Duration::from_nanos(16_666_667);

/// Remaining distance and velocity below which the spring snaps and stops.
pub const REST_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub damping: f64,
    pub stiffness: f64,
    pub mass: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self { damping: 0.7, stiffness: 0.1, mass: 1.25 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpringStep {
    /// Write this offset and keep animating.
    Move(f64),
    /// Write the target exactly; the spring has stopped.
    Settle(f64),
}

/// Spring-damper integrator for one scroll axis.
#[derive(Debug, Clone)]
pub struct SpringDriver {
    config: SpringConfig,
    velocity: f64,
    running: bool,
    last_frame: Option<Instant>,
}

impl SpringDriver {
    #[must_use]
    pub fn new(config: SpringConfig) -> Self {
        Self { config, velocity: 0.0, running: false, last_frame: None }
    }

    /// (Re)start toward a fresh target. Velocity carries over so retargeting
    /// mid-flight stays smooth.
    pub fn start(&mut self) {
        self.running = true;
        self.last_frame = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.velocity = 0.0;
        self.last_frame = None;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Advance one frame from `current` toward `target`.
    ///
    /// The returned position never moves away from the target and never
    /// passes it.
    pub fn step(&mut self, current: f64, target: f64, now: Instant) -> Option<SpringStep> {
        if !self.running {
            return None;
        }
        let dt = self.last_frame.map_or(1.0, |last| {
            now.saturating_duration_since(last).as_secs_f64() / FRAME.as_secs_f64()
        });
        self.last_frame = Some(now);

        let diff = target - current;
        if diff.abs() < REST_THRESHOLD && self.velocity.abs() < REST_THRESHOLD {
            self.stop();
            return Some(SpringStep::Settle(target));
        }

        let SpringConfig { damping, stiffness, mass } = self.config;
        self.velocity = (damping * self.velocity + stiffness * diff) / mass;

        let step = self.velocity * dt;
        let next = if diff > 0.0 && step > 0.0 {
            current + step.min(diff)
        } else if diff < 0.0 && step < 0.0 {
            current + step.max(diff)
        } else {
            current
        };
        Some(SpringStep::Move(next))
    }
}
