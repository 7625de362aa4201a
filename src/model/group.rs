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
use std::rc::Rc;

/// A display unit: one or more source messages folded into a single message.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTurn {
    /// Indexes into the source list, ascending. Never empty.
    pub source_indexes: Vec<usize>,
    pub message: ChatMessage,
}

impl GroupedTurn {
    /// Stable identity for per-turn state (first source index).
    #[must_use]
    pub fn key(&self) -> usize {
        self.source_indexes.first().copied().unwrap_or_default()
    }
}

/// Fold consecutive assistant fragments into single turns.
///
/// Only assistant-to-assistant adjacency merges; every other pairing starts a
/// new group. Every input index lands in exactly one group.
pub fn group_messages(messages: &[ChatMessage]) -> Vec<GroupedTurn> {
    let mut grouped: Vec<GroupedTurn> = Vec::with_capacity(messages.len());
    for (i, msg) in messages.iter().enumerate() {
        if let ChatMessage::Assistant { content } = msg
            && let Some(GroupedTurn {
                source_indexes,
                message: ChatMessage::Assistant { content: merged },
            }) = grouped.last_mut()
        {
            source_indexes.push(i);
            merged.push_str(content);
            continue;
        }
        grouped.push(GroupedTurn { source_indexes: vec![i], message: msg.clone() });
    }
    grouped
}

/// Memoizes [`group_messages`] on the identity of the input list.
///
/// A new `Rc` means a new list; the same `Rc` returns the cached grouping
/// without re-folding.
pub struct GroupCache {
    input: Option<Rc<[ChatMessage]>>,
    output: Rc<[GroupedTurn]>,
}

impl GroupCache {
    pub fn new() -> Self {
        Self { input: None, output: Rc::from(Vec::new()) }
    }

    pub fn get(&mut self, messages: &Rc<[ChatMessage]>) -> Rc<[GroupedTurn]> {
        if let Some(input) = &self.input
            && Rc::ptr_eq(input, messages)
        {
            return Rc::clone(&self.output);
        }
        self.output = group_messages(messages).into();
        self.input = Some(Rc::clone(messages));
        Rc::clone(&self.output)
    }
}

impl Default for GroupCache {
    fn default() -> Self {
        Self::new()
    }
}
