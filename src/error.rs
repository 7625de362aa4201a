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

/// Failures surfaced by the demo binary. Each maps to a stable exit code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Transcript file not found")]
    TranscriptNotFound,
    #[error("Transcript file is not a valid message list")]
    InvalidTranscript,
    #[error("Config file could not be loaded")]
    InvalidConfig,
    #[error("Terminal unavailable")]
    TerminalUnavailable,
}

impl AppError {
    pub const TRANSCRIPT_NOT_FOUND_EXIT_CODE: i32 = 20;
    pub const INVALID_TRANSCRIPT_EXIT_CODE: i32 = 21;
    pub const INVALID_CONFIG_EXIT_CODE: i32 = 22;
    pub const TERMINAL_UNAVAILABLE_EXIT_CODE: i32 = 23;

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TranscriptNotFound => Self::TRANSCRIPT_NOT_FOUND_EXIT_CODE,
            Self::InvalidTranscript => Self::INVALID_TRANSCRIPT_EXIT_CODE,
            Self::InvalidConfig => Self::INVALID_CONFIG_EXIT_CODE,
            Self::TerminalUnavailable => Self::TERMINAL_UNAVAILABLE_EXIT_CODE,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TranscriptNotFound => "The transcript file passed to --transcript does not exist.",
            Self::InvalidTranscript => {
                "The transcript file must contain a JSON array of chat messages."
            }
            Self::InvalidConfig => "The file passed to --config is not a valid JSON config.",
            Self::TerminalUnavailable => {
                "Could not take over the terminal. Run convo-kit from an interactive TTY."
            }
        }
    }
}

/// Errors from the length-prefixed streaming body codec.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("stream I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
    #[error("stream ended mid-frame: expected {expected} bytes, got {received}")]
    Truncated { expected: usize, received: usize },
    #[error("stream ended before the header frame")]
    MissingHeader,
    #[error("header frame is not valid UTF-8")]
    InvalidHeader(#[from] std::string::FromUtf8Error),
    #[error("frame body is not a valid item: {0}")]
    Json(#[from] serde_json::Error),
}

/// Terminal outcomes of a generation round. Each one ends the response with
/// an error frame; retrying is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("model failed: {0}")]
    Model(String),
    #[error("tool `{name}` failed: {message}")]
    Tool { name: String, message: String },
    #[error("a generation is already running for this conversation")]
    ConversationBusy,
}
