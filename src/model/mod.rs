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

pub mod export;
mod group;
mod types;
mod typing;

pub use group::{GroupCache, GroupedTurn, group_messages};
pub use types::{
    ArgumentValue, ChatMessage, ContentPart, FunctionCall, FunctionDefinition, FunctionTag,
    MAX_NAME_LEN, ObjectTag, ParamSpec, ParamType, Parameters, Role, ToolCall, ToolDefinition,
    ToolResponse, validate_tool_call,
};
pub use typing::{TypingState, typing_state};
