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

use super::types::ChatMessage;
use std::collections::HashSet;

/// What the assistant is expected to do next, given the transcript so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingState {
    /// The assistant owes the user a reply.
    Typing,
    /// At least one tool call has no response yet.
    CallingTool,
    Idle,
}

/// Classify a transcript.
///
/// `type_after_tools` names tools whose results the assistant should comment
/// on; calling one of them after the last assistant message means another
/// generation round is due.
pub fn typing_state(messages: &[ChatMessage], type_after_tools: &[&str]) -> TypingState {
    let answered: HashSet<&str> = messages
        .iter()
        .filter_map(|m| match m {
            ChatMessage::ToolResponse(r) => Some(r.tool_call_id.as_str()),
            _ => None,
        })
        .collect();
    let outstanding = messages.iter().any(|m| {
        matches!(m, ChatMessage::ToolCall { tool_call } if !answered.contains(tool_call.tool_call_id.as_str()))
    });
    if outstanding {
        return TypingState::CallingTool;
    }

    let Some(last_assistant) =
        messages.iter().rposition(|m| matches!(m, ChatMessage::Assistant { .. }))
    else {
        return TypingState::Typing;
    };

    let tail = &messages[last_assistant..];
    if tail.iter().any(|m| matches!(m, ChatMessage::User { .. })) {
        return TypingState::Typing;
    }

    let retypes = tail.iter().any(|m| {
        matches!(m, ChatMessage::ToolCall { tool_call } if type_after_tools.contains(&tool_call.function.name.as_str()))
    });
    if retypes { TypingState::Typing } else { TypingState::Idle }
}
