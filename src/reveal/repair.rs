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

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Only this many trailing characters are inspected; everything before them
/// is passed through untouched.
pub const REPAIR_WINDOW_CHARS: usize = 100;

/// `<before>[title](partial-href` with no closing paren yet.
static OPEN_HREF: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*)\[([^\]]+)\]\([^)]*$").ok());

/// `<before>[title` or `<before>[title]` at the very end.
static OPEN_TITLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*)\[([^\]]+)\]?$").ok());

/// Strip link syntax that is still arriving so it shows as plain title text.
///
/// `see [Google](https://goo` becomes `see Google`, `see [Google` becomes
/// `see Google`. Complete links are returned unchanged.
pub fn clean_truncated_link(md: &str) -> Cow<'_, str> {
    let split = window_start(md, REPAIR_WINDOW_CHARS);
    let (untouched, scan) = md.split_at(split);

    for pattern in [&*OPEN_HREF, &*OPEN_TITLE] {
        let Some(pattern) = pattern else {
            continue;
        };
        if let Some(caps) = pattern.captures(scan) {
            let before = caps.get(1).map_or("", |m| m.as_str());
            let title = caps.get(2).map_or("", |m| m.as_str());
            let mut repaired = String::with_capacity(untouched.len() + before.len() + title.len());
            repaired.push_str(untouched);
            repaired.push_str(before);
            repaired.push_str(title);
            return Cow::Owned(repaired);
        }
    }
    Cow::Borrowed(md)
}

/// Byte offset where the last `chars` characters of `text` begin.
fn window_start(text: &str, chars: usize) -> usize {
    text.char_indices().rev().nth(chars.saturating_sub(1)).map_or(0, |(i, _)| i)
}
