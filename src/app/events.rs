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

use super::App;
use crate::scroll::SelectionSpan;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Instant;

const MOUSE_SCROLL_LINES: i32 = 3;

pub fn handle_terminal_event(app: &mut App, event: Event, now: Instant) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key, now),
        Event::Mouse(mouse) => handle_mouse(app, mouse, now),
        Event::Paste(text) => app.input.push_str(&text.replace(['\r', '\n'], " ")),
        // Resize is picked up by the next frame's layout
        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Char('f') if ctrl => {
            let on = !app.chat.fast_forward();
            app.chat.set_fast_forward(on);
        }
        KeyCode::Esc => {
            if app.is_streaming() {
                app.cancel_response();
            } else {
                app.pointer.clear_selection();
            }
        }
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::End => app.chat.scroll_to_bottom(),
        KeyCode::PageUp => {
            let rows = app.chat.page_rows();
            app.chat.user_scroll_rows(-rows, now);
        }
        KeyCode::PageDown => {
            let rows = app.chat.page_rows();
            app.chat.user_scroll_rows(rows, now);
        }
        KeyCode::Up => app.chat.user_scroll_rows(-1, now),
        KeyCode::Down => app.chat.user_scroll_rows(1, now),
        KeyCode::Char(c) if !ctrl => app.input.push(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.chat.user_scroll_rows(-MOUSE_SCROLL_LINES, now),
        MouseEventKind::ScrollDown => app.chat.user_scroll_rows(MOUSE_SCROLL_LINES, now),
        MouseEventKind::Down(MouseButton::Left) => {
            app.pointer.press();
            app.pointer.clear_selection();
            app.drag_anchor = app.chat.content_y_at(mouse.row);
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if let (Some(anchor), Some(y)) = (app.drag_anchor, app.chat.content_y_at(mouse.row)) {
                app.pointer.select(SelectionSpan::new(anchor, y));
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.pointer.release();
            app.drag_anchor = None;
        }
        _ => {}
    }
}
