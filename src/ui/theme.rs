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

use ratatui::style::Color;

// Accent
pub const ACCENT: Color = Color::Rgb(244, 118, 0);

// UI chrome
pub const DIM: Color = Color::DarkGray;
pub const PROMPT_CHAR: &str = "❯";
pub const SEPARATOR_CHAR: &str = "─";

// Role header colors
pub const ROLE_USER: Color = Color::White;
pub const ROLE_ASSISTANT: Color = ACCENT;

// User message background
pub const USER_MSG_BG: Color = Color::Rgb(40, 44, 52);

// Tool call status
pub const ICON_RUNNING: &str = "⏵";
pub const ICON_COMPLETED: &str = "✓";
pub const STATUS_RUNNING: Color = Color::Cyan;
pub const STATUS_DONE: Color = Color::Green;
pub const STATUS_ERROR: Color = Color::Red;

// Shown while the view is scrolled away from new output
pub const NEW_MESSAGES_HINT: &str = " ↓ new messages ";
pub const HINT_BG: Color = ACCENT;
pub const HINT_FG: Color = Color::Black;

pub const SPINNER_FRAMES: &[char] = &[
    '\u{280B}', '\u{2819}', '\u{2839}', '\u{2838}', '\u{283C}', '\u{2834}', '\u{2826}', '\u{2827}',
    '\u{2807}', '\u{280F}',
];
