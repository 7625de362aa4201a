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

//! Length-prefixed streaming of assistant responses, both ends.

mod client;
mod frame;
mod server;

pub use client::{StreamingBody, read_streaming_body};
pub use frame::{FrameReader, FrameWriter, MAX_FRAME_BYTES, StreamedItem};
pub use server::{
    BUSY_TEXT, CANCELLED_TEXT, CommitOutcome, CommitStore, CommittedMessage, EMPTY_GENERATION_TEXT,
    Generation, GenerationGuard, LanguageModel, MAX_GENERATIONS, MODEL_ERROR_TEXT, StreamCoordinator,
    StreamOutcome, StreamRequest, TOOL_ERROR_TEXT, ToolOutput, ToolRunner, generate_and_stream,
    generate_and_stream_without_tools,
};
