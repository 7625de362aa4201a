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

mod chat;
mod markdown;
mod slots;
pub mod theme;
mod viewport;

pub use chat::ChatView;
pub use slots::TerminalSlots;
pub use viewport::{ROW_PX, TerminalViewport};

use crate::app::App;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use std::time::Instant;
use unicode_width::UnicodeWidthStr;

const FOOTER_PAD: u16 = 2;

pub fn render(frame: &mut Frame, app: &mut App, now: Instant) {
    let [body, input_sep, input, footer] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let streaming = app.is_streaming();
    app.chat.render(frame, body, &app.messages, streaming, now);

    render_separator(frame, input_sep);
    render_input(frame, input, app);
    render_footer(frame, footer, app);
}

fn render_separator(frame: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }
    let line = theme::SEPARATOR_CHAR.repeat(usize::from(area.width));
    frame.render_widget(Paragraph::new(Span::styled(line, Style::default().fg(theme::DIM))), area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let prompt = format!("{} ", theme::PROMPT_CHAR);
    let line = Line::from(vec![
        Span::styled(prompt.clone(), Style::default().fg(theme::ACCENT)),
        Span::raw(app.input.clone()),
    ]);
    frame.render_widget(Paragraph::new(line), area);

    let cursor_x = area.x.saturating_add(
        u16::try_from(prompt.width() + app.input.width()).unwrap_or(u16::MAX),
    );
    if cursor_x < area.right() {
        frame.set_cursor_position((cursor_x, area.y));
    }
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let padded = Rect {
        x: area.x + FOOTER_PAD.min(area.width),
        width: area.width.saturating_sub(FOOTER_PAD * 2),
        ..area
    };

    let help = Line::from(vec![
        Span::styled("End", Style::default().fg(Color::White)),
        Span::styled(" bottom  ", Style::default().fg(theme::DIM)),
        Span::styled("Esc", Style::default().fg(Color::White)),
        Span::styled(" stop  ", Style::default().fg(theme::DIM)),
        Span::styled("Ctrl+F", Style::default().fg(Color::White)),
        Span::styled(" fast-forward  ", Style::default().fg(theme::DIM)),
        Span::styled("Ctrl+C", Style::default().fg(Color::White)),
        Span::styled(" quit", Style::default().fg(theme::DIM)),
    ]);
    frame.render_widget(Paragraph::new(help), padded);

    let (text, color) = if let Some(error) = &app.last_error {
        (error.clone(), theme::STATUS_ERROR)
    } else if app.chat.scroll().is_at_bottom() {
        ("pinned".to_owned(), theme::DIM)
    } else {
        ("scrolled".to_owned(), theme::ACCENT)
    };
    let width = u16::try_from(text.width()).unwrap_or(padded.width).min(padded.width);
    let right = Rect { x: padded.right().saturating_sub(width), width, ..padded };
    frame.render_widget(Paragraph::new(Span::styled(text, Style::default().fg(color))), right);
}
