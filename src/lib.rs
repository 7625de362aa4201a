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

pub mod app;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod reveal;
pub mod scroll;
pub mod stream;
pub mod ui;

use clap::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Text,
    Html,
}

#[derive(Parser, Debug)]
#[command(name = "convo-kit", about = "Sticky-scrolling chat transcript with streamed reveal")]
pub struct Cli {
    /// JSON config file (partial files are fine; missing fields use defaults)
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Override the reveal pacing from the config
    #[arg(long, value_enum)]
    pub pacing: Option<config::PacingKind>,

    /// How assistant slots learn about reveal progress
    #[arg(long, value_enum, default_value_t = layout::RevealMode::Callback)]
    pub reveal_mode: layout::RevealMode,

    /// Show streamed text immediately instead of pacing it
    #[arg(long)]
    pub fast_forward: bool,

    /// JSON array of chat messages to start from
    #[arg(long)]
    pub transcript: Option<std::path::PathBuf>,

    /// Print the transcript in this format and exit
    #[arg(long, value_enum)]
    pub export: Option<ExportFormat>,

    /// Label language for `--export`
    #[arg(long, value_enum, default_value_t = model::export::Language::English)]
    pub language: model::export::Language,

    /// Delay between streamed chunks of the scripted model, in milliseconds
    #[arg(long, default_value_t = 40)]
    pub chunk_delay_ms: u64,

    /// Write tracing diagnostics to a file (disabled unless explicitly set).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<std::path::PathBuf>,

    /// Tracing filter directives (example: `info,convo_kit::scroll=debug`).
    /// Falls back to `RUST_LOG` when omitted.
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Append to `--log-file` instead of truncating on startup.
    #[arg(long)]
    pub log_append: bool,
}
