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

//! Composes grouped turns into role-specific slots.
//!
//! The layout decides *what* is shown and in which order; a [`RenderSlots`]
//! implementation decides *how*. System messages and tool responses never get
//! a slot of their own: responses are handed to the slot of the call they
//! answer.

use crate::model::{ChatMessage, ContentPart, GroupCache, GroupedTurn, ToolCall, ToolResponse};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// How assistant slots learn about reveal progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RevealMode {
    /// Slots receive a [`ContentShown`] handle to notify on every reveal step.
    #[default]
    Callback,
    /// Slots receive whether their turn is still streaming.
    StreamingFlag,
}

/// Shared "new content became visible" flag.
///
/// Reveal callbacks call [`notify`](Self::notify); the frame loop calls
/// [`take`](Self::take) after layout and forwards to the scroll controller.
#[derive(Debug, Clone, Default)]
pub struct ContentShown {
    pending: Rc<Cell<bool>>,
}

impl ContentShown {
    pub fn notify(&self) {
        self.pending.set(true);
    }

    /// Returns whether anything was shown since the last call, and resets.
    pub fn take(&self) -> bool {
        self.pending.replace(false)
    }
}

pub enum AssistantReveal<'a> {
    ContentShown(&'a ContentShown),
    Streaming(bool),
}

/// Context handed to every slot.
pub struct SlotContext<'a> {
    /// Position of this turn among the displayed turns.
    pub message_index: usize,
    /// Stable identity of the turn (its first source index).
    pub key: usize,
    /// All displayed turns, in order.
    pub turns: &'a [&'a GroupedTurn],
}

impl SlotContext<'_> {
    pub fn turn(&self) -> Option<&GroupedTurn> {
        self.turns.get(self.message_index).copied()
    }

    /// True for the last displayed turn.
    pub fn is_last(&self) -> bool {
        self.message_index + 1 == self.turns.len()
    }
}

/// Presentation extension points.
pub trait RenderSlots {
    type Output;

    /// One call per content part of a user turn.
    fn user_content(&mut self, ctx: &SlotContext<'_>, part: &ContentPart) -> Self::Output;

    fn assistant_text(
        &mut self,
        ctx: &SlotContext<'_>,
        text: &str,
        reveal: AssistantReveal<'_>,
    ) -> Self::Output;

    /// `response` is `None` while the call is outstanding.
    fn tool_call(
        &mut self,
        ctx: &SlotContext<'_>,
        call: &ToolCall,
        response: Option<&ToolResponse>,
    ) -> Self::Output;

    fn footer(&mut self) -> Option<Self::Output> {
        None
    }
}

/// The chat layout renderer.
pub struct ChatLayout {
    mode: RevealMode,
    groups: GroupCache,
    content_shown: ContentShown,
}

impl Default for ChatLayout {
    fn default() -> Self {
        Self::new(RevealMode::default())
    }
}

impl ChatLayout {
    pub fn new(mode: RevealMode) -> Self {
        Self { mode, groups: GroupCache::new(), content_shown: ContentShown::default() }
    }

    pub fn mode(&self) -> RevealMode {
        self.mode
    }

    pub fn content_shown(&self) -> &ContentShown {
        &self.content_shown
    }

    /// Grouped view of `messages`, memoized on the `Rc`.
    pub fn grouped(&mut self, messages: &Rc<[ChatMessage]>) -> Rc<[GroupedTurn]> {
        self.groups.get(messages)
    }

    /// Render every displayed turn through `slots`.
    ///
    /// `streaming` marks the final turn as still receiving text.
    pub fn render<S: RenderSlots>(
        &mut self,
        messages: &Rc<[ChatMessage]>,
        streaming: bool,
        slots: &mut S,
    ) -> Vec<S::Output> {
        let grouped = self.groups.get(messages);

        let responses: HashMap<&str, &ToolResponse> = grouped
            .iter()
            .filter_map(|turn| match &turn.message {
                ChatMessage::ToolResponse(response) => {
                    Some((response.tool_call_id.as_str(), response))
                }
                _ => None,
            })
            .collect();

        let shown: Vec<&GroupedTurn> = grouped
            .iter()
            .filter(|turn| match &turn.message {
                ChatMessage::System { .. } | ChatMessage::ToolResponse(_) => false,
                ChatMessage::Assistant { content } => !content.is_empty(),
                ChatMessage::User { .. } | ChatMessage::ToolCall { .. } => true,
            })
            .collect();

        let mut out = Vec::with_capacity(shown.len() + 1);
        for (index, turn) in shown.iter().enumerate() {
            let ctx = SlotContext { message_index: index, key: turn.key(), turns: &shown };
            match &turn.message {
                ChatMessage::User { content } => {
                    out.extend(content.iter().map(|part| slots.user_content(&ctx, part)));
                }
                ChatMessage::Assistant { content } => {
                    let reveal = match self.mode {
                        RevealMode::Callback => AssistantReveal::ContentShown(&self.content_shown),
                        RevealMode::StreamingFlag => {
                            AssistantReveal::Streaming(streaming && ctx.is_last())
                        }
                    };
                    out.push(slots.assistant_text(&ctx, content, reveal));
                }
                ChatMessage::ToolCall { tool_call } => {
                    let response = responses.get(tool_call.tool_call_id.as_str()).copied();
                    out.push(slots.tool_call(&ctx, tool_call, response));
                }
                ChatMessage::System { .. } | ChatMessage::ToolResponse(_) => {}
            }
        }
        out.extend(slots.footer());
        out
    }
}
