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

//! JSON configuration for the engines. Every field has a default, so a
//! partial file only overrides what it names.

use crate::error::AppError;
use crate::reveal::{AdaptiveConfig, FixedRateConfig, Pacing};
use crate::scroll::StickyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PacingKind {
    #[default]
    Adaptive,
    Fixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub pacing: PacingKind,
    pub fixed: FixedRateConfig,
    pub adaptive: AdaptiveConfig,
}

impl RevealConfig {
    pub fn pacing(&self) -> Pacing {
        match self.pacing {
            PacingKind::Adaptive => Pacing::adaptive(self.adaptive),
            PacingKind::Fixed => Pacing::fixed(self.fixed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitConfig {
    pub reveal: RevealConfig,
    pub sticky: StickyConfig,
}

impl KitConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Load a config file, or the defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<KitConfig, AppError> {
    let Some(path) = path else {
        return Ok(KitConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|err| {
        tracing::warn!(path = %path.display(), %err, "config file unreadable");
        AppError::InvalidConfig
    })?;
    KitConfig::from_json(&text).map_err(|err| {
        tracing::warn!(path = %path.display(), %err, "config file rejected");
        AppError::InvalidConfig
    })
}
