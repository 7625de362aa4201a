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

//! The scrollable chat body: layout, reveal, and sticky scrolling per frame.

use super::slots::TerminalSlots;
use super::theme;
use super::viewport::{ROW_PX, TerminalViewport};
use crate::config::KitConfig;
use crate::layout::{ChatLayout, RevealMode};
use crate::model::ChatMessage;
use crate::scroll::{PointerState, SelectionSpan, StickyScroll};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Paragraph, Widget, Wrap};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Everything the chat body keeps between frames.
pub struct ChatView {
    layout: ChatLayout,
    slots: TerminalSlots,
    scroll: StickyScroll<TerminalViewport>,
    area: Rect,
    top_padding: u16,
}

impl ChatView {
    pub fn new(config: &KitConfig, mode: RevealMode, pointer: PointerState, fast_forward: bool, now: Instant) -> Self {
        Self {
            layout: ChatLayout::new(mode),
            slots: TerminalSlots::new(config.reveal.pacing(), fast_forward, now),
            scroll: StickyScroll::new(TerminalViewport::new(), pointer, config.sticky),
            area: Rect::default(),
            top_padding: 0,
        }
    }

    pub fn scroll(&self) -> &StickyScroll<TerminalViewport> {
        &self.scroll
    }

    pub fn slots(&self) -> &TerminalSlots {
        &self.slots
    }

    pub fn set_fast_forward(&mut self, on: bool) {
        self.slots.set_fast_forward(on);
    }

    pub fn fast_forward(&self) -> bool {
        self.slots.fast_forward()
    }

    /// Area of the last rendered body.
    pub fn area(&self) -> Rect {
        self.area
    }

    /// Scroll by whole rows as the user would; negative is up.
    pub fn user_scroll_rows(&mut self, rows: i32, now: Instant) {
        self.scroll.host_mut().user_scroll_rows(rows);
        self.scroll.pump(now);
    }

    pub fn page_rows(&self) -> i32 {
        i32::from(self.area.height.saturating_sub(1).max(1))
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll.scroll_to_bottom();
    }

    /// When the body next needs drawing on its own, given the last frame.
    /// `None` once nothing is animating and no timer is pending.
    pub fn next_frame_at(&self, last_frame: Instant, interval: Duration) -> Option<Instant> {
        if !self.scroll.is_mounted() || self.scroll.is_animating() || self.slots.needs_frame() {
            return Some(last_frame + interval);
        }
        self.scroll.next_deadline().map(|deadline| deadline.max(last_frame + interval))
    }

    /// Content coordinate under a terminal row, if the row is inside the body.
    pub fn content_y_at(&self, row: u16) -> Option<f64> {
        let top = self.area.y + self.top_padding;
        if row < top || row >= self.area.bottom() {
            return None;
        }
        Some(self.scroll.host().content_y(row - top))
    }

    /// Lay out, reveal, scroll, and draw one frame.
    ///
    /// Order matters: reveal ticks run during layout, the new content height
    /// reaches the controller as a resize, and only then is the controller
    /// told that content was shown and allowed to animate.
    pub fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        messages: &Rc<[ChatMessage]>,
        streaming: bool,
        now: Instant,
    ) {
        self.slots.begin_frame(now, streaming);
        let lines: Vec<Line<'static>> =
            self.layout.render(messages, streaming, &mut self.slots).concat();
        self.slots.end_frame();

        let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
        let content_rows = paragraph.line_count(area.width);
        self.scroll.host_mut().set_rows(content_rows, area.height);
        if !self.scroll.is_mounted() {
            self.scroll.mount(now);
            // a chat opens at its newest message
            self.scroll.scroll_to_bottom();
        }
        self.scroll.pump(now);
        if self.layout.content_shown().take() {
            self.scroll.on_content_shown();
        }
        self.scroll.tick(now);
        self.scroll.pump(now);

        self.area = area;
        let viewport_rows = usize::from(area.height);
        if content_rows <= viewport_rows {
            // Short content sits at the bottom of the body, just above the input.
            #[allow(clippy::cast_possible_truncation)]
            let pad = (viewport_rows - content_rows) as u16;
            self.top_padding = pad;
            let render_area = Rect { y: area.y + pad, height: area.height - pad, ..area };
            frame.render_widget(paragraph, render_area);
        } else {
            self.top_padding = 0;
            let offset = u16::try_from(self.scroll.host().offset_rows()).unwrap_or(u16::MAX);
            frame.render_widget(paragraph.scroll((offset, 0)), area);
        }

        if let Some(span) = self.scroll.pointer().selection() {
            let body = Rect {
                y: area.y + self.top_padding,
                height: area.height - self.top_padding,
                ..area
            };
            frame.render_widget(
                SelectionOverlay { span, offset_px: self.scroll.host().content_y(0) },
                body,
            );
        }

        if !self.scroll.is_at_bottom() && content_rows > viewport_rows {
            render_new_messages_hint(frame, area);
        }
    }
}

/// Reverses the rows covered by the current selection.
struct SelectionOverlay {
    span: SelectionSpan,
    offset_px: f64,
}

impl Widget for SelectionOverlay {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render(self, area: Rect, buf: &mut Buffer) {
        let first = ((self.span.start - self.offset_px) / ROW_PX).floor().max(0.0) as u16;
        let last = ((self.span.end - self.offset_px) / ROW_PX).floor();
        if last < 0.0 {
            return;
        }
        let last = last as u16;
        for row in first..=last {
            let y = area.y.saturating_add(row);
            if y >= area.bottom() {
                break;
            }
            for x in area.left()..area.right() {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_style(cell.style().add_modifier(Modifier::REVERSED));
                }
            }
        }
    }
}

fn render_new_messages_hint(frame: &mut Frame, area: Rect) {
    let width = u16::try_from(theme::NEW_MESSAGES_HINT.chars().count()).unwrap_or(area.width);
    if area.height == 0 || width > area.width {
        return;
    }
    let hint = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.bottom() - 1,
        width,
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(theme::NEW_MESSAGES_HINT)
            .style(Style::default().fg(theme::HINT_FG).bg(theme::HINT_BG)),
        hint,
    );
}
