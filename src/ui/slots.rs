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

//! Terminal presentation of each chat slot.

use super::markdown::render_markdown_safe;
use super::theme;
use crate::layout::{AssistantReveal, RenderSlots, SlotContext};
use crate::model::{ArgumentValue, ContentPart, ToolCall, ToolResponse};
use crate::reveal::{Pacing, RevealScheduler};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

const TOOL_SUMMARY_CHARS: usize = 80;

/// Per-turn reveal plus the lines last rendered from it.
struct AssistantTurn {
    reveal: RevealScheduler,
    rendered: Option<(String, Vec<Line<'static>>)>,
}

/// [`RenderSlots`] producing ratatui lines.
///
/// Owns one [`RevealScheduler`] per assistant turn, keyed by the turn's
/// first source index. Schedulers for turns that stop being rendered are
/// dropped at the end of the frame.
pub struct TerminalSlots {
    pacing: Pacing,
    fast_forward: bool,
    now: Instant,
    streaming: bool,
    spinner_frame: usize,
    turns: HashMap<usize, AssistantTurn>,
    touched: HashSet<usize>,
    revealed_this_frame: bool,
}

impl TerminalSlots {
    pub fn new(pacing: Pacing, fast_forward: bool, now: Instant) -> Self {
        Self {
            pacing,
            fast_forward,
            now,
            streaming: false,
            spinner_frame: 0,
            turns: HashMap::new(),
            touched: HashSet::new(),
            revealed_this_frame: false,
        }
    }

    pub fn begin_frame(&mut self, now: Instant, streaming: bool) {
        self.now = now;
        self.streaming = streaming;
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        self.touched.clear();
        self.revealed_this_frame = false;
    }

    /// Drop reveal state for turns that were not rendered this frame.
    pub fn end_frame(&mut self) {
        let touched = &self.touched;
        self.turns.retain(|key, _| touched.contains(key));
    }

    pub fn set_fast_forward(&mut self, on: bool) {
        self.fast_forward = on;
        if on {
            for turn in self.turns.values_mut() {
                turn.reveal.fast_forward();
            }
        }
    }

    pub fn fast_forward(&self) -> bool {
        self.fast_forward
    }

    /// Whether any assistant text advanced during the last frame.
    pub fn revealed_this_frame(&self) -> bool {
        self.revealed_this_frame
    }

    /// True while some turn still has hidden text to reveal.
    pub fn needs_frame(&self) -> bool {
        self.turns.values().any(|turn| turn.reveal.needs_frame())
    }

    pub fn reveal_for(&self, key: usize) -> Option<&RevealScheduler> {
        self.turns.get(&key).map(|turn| &turn.reveal)
    }

    fn spinner(&self) -> char {
        theme::SPINNER_FRAMES[self.spinner_frame % theme::SPINNER_FRAMES.len()]
    }
}

fn role_header(label: &'static str, color: ratatui::style::Color) -> Line<'static> {
    Line::from(Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)))
}

impl RenderSlots for TerminalSlots {
    type Output = Vec<Line<'static>>;

    fn user_content(&mut self, ctx: &SlotContext<'_>, part: &ContentPart) -> Self::Output {
        let mut out = Vec::new();
        let first_part = match ctx.turn().map(|turn| &turn.message) {
            Some(crate::model::ChatMessage::User { content }) => {
                content.first().is_some_and(|first| std::ptr::eq(first, part))
            }
            _ => true,
        };
        if first_part {
            out.push(role_header("You", theme::ROLE_USER));
        }
        match part {
            ContentPart::Text { content } => {
                out.extend(render_markdown_safe(content, Some(theme::USER_MSG_BG)));
            }
            ContentPart::Image { mime_type, .. } => out.push(Line::from(Span::styled(
                format!("[image: {mime_type}]"),
                Style::default().fg(theme::DIM),
            ))),
            ContentPart::File { .. } => {
                out.push(Line::from(Span::styled("[file]", Style::default().fg(theme::DIM))));
            }
        }
        out.push(Line::default());
        out
    }

    fn assistant_text(
        &mut self,
        ctx: &SlotContext<'_>,
        text: &str,
        reveal: AssistantReveal<'_>,
    ) -> Self::Output {
        let streaming = match reveal {
            AssistantReveal::Streaming(flag) => flag,
            AssistantReveal::ContentShown(_) => self.streaming && ctx.is_last(),
        };
        let now = self.now;
        self.touched.insert(ctx.key);

        let turn = match self.turns.entry(ctx.key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut scheduler = if streaming {
                    RevealScheduler::new(self.pacing.clone(), now)
                } else {
                    RevealScheduler::settled(text, self.pacing.clone(), now)
                };
                if let AssistantReveal::ContentShown(shown) = &reveal {
                    let shown = (*shown).clone();
                    scheduler.set_content_shown(Some(Box::new(move |_: &str| shown.notify())));
                }
                if self.fast_forward {
                    scheduler.fast_forward();
                }
                entry.insert(AssistantTurn { reveal: scheduler, rendered: None })
            }
        };

        let before = turn.reveal.state().shown_chars();
        turn.reveal.update(text, streaming, now);
        turn.reveal.tick(now);
        if turn.reveal.state().shown_chars() != before {
            self.revealed_this_frame = true;
        }

        let visible = turn.reveal.visible_text();
        let stale = turn.rendered.as_ref().is_none_or(|(source, _)| source != visible);
        if stale {
            let lines = render_markdown_safe(visible, None);
            turn.rendered = Some((visible.to_owned(), lines));
        }

        let mut out = vec![role_header("Assistant", theme::ROLE_ASSISTANT)];
        if let Some((_, lines)) = &turn.rendered {
            out.extend(lines.iter().cloned());
        }
        out.push(Line::default());
        out
    }

    fn tool_call(
        &mut self,
        _ctx: &SlotContext<'_>,
        call: &ToolCall,
        response: Option<&ToolResponse>,
    ) -> Self::Output {
        let (icon, color) = match response {
            Some(_) => (theme::ICON_COMPLETED.to_owned(), theme::STATUS_DONE),
            None => (self.spinner().to_string(), theme::STATUS_RUNNING),
        };
        let mut out = vec![Line::from(vec![
            Span::styled(format!("{icon} "), Style::default().fg(color)),
            Span::styled(
                call.function.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("({})", format_arguments(call)), Style::default().fg(theme::DIM)),
        ])];
        if let Some(response) = response {
            out.push(Line::from(Span::styled(
                format!("  └ {}", summarize(&response.content)),
                Style::default().fg(theme::DIM),
            )));
        }
        out.push(Line::default());
        out
    }

    fn footer(&mut self) -> Option<Self::Output> {
        if !self.streaming {
            return None;
        }
        Some(vec![Line::from(Span::styled(
            format!("{} {} Thinking...", theme::ICON_RUNNING, self.spinner()),
            Style::default().fg(theme::DIM),
        ))])
    }
}

fn format_arguments(call: &ToolCall) -> String {
    call.function
        .arguments
        .iter()
        .map(|(key, value)| match value {
            ArgumentValue::String(s) => format!("{key}: {s:?}"),
            ArgumentValue::Number(n) => format!("{key}: {n}"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn summarize(content: &serde_json::Value) -> String {
    let text = match content {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() > TOOL_SUMMARY_CHARS {
        let cut: String = first_line.chars().take(TOOL_SUMMARY_CHARS).collect();
        format!("{cut}…")
    } else {
        first_line.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ChatLayout, RevealMode};
    use crate::model::ChatMessage;
    use crate::reveal::FixedRateConfig;
    use std::rc::Rc;
    use std::time::Duration;

    fn text_of(lines: &[Line<'_>]) -> String {
        lines.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    }

    fn slow_pacing() -> Pacing {
        Pacing::fixed(FixedRateConfig { interval_ms: 100, catch_up_window_ms: 100_000, min_chars_per_sec: 10.0 })
    }

    #[test]
    fn history_is_shown_in_full() {
        let t0 = Instant::now();
        let mut slots = TerminalSlots::new(slow_pacing(), false, t0);
        let mut layout = ChatLayout::new(RevealMode::Callback);
        let msgs: Rc<[ChatMessage]> =
            vec![ChatMessage::user_text("hi"), ChatMessage::assistant("hello there")].into();

        slots.begin_frame(t0, false);
        let lines = layout.render(&msgs, false, &mut slots).concat();
        slots.end_frame();

        let text = text_of(&lines);
        assert!(text.contains("You"));
        assert!(text.contains("hello there"));
        assert!(!slots.needs_frame());
    }

    #[test]
    fn streaming_turn_reveals_progressively_and_notifies() {
        let t0 = Instant::now();
        let mut slots = TerminalSlots::new(slow_pacing(), false, t0);
        let mut layout = ChatLayout::new(RevealMode::Callback);
        let msgs: Rc<[ChatMessage]> =
            vec![ChatMessage::user_text("hi"), ChatMessage::assistant("abcdefghij")].into();

        slots.begin_frame(t0, true);
        let lines = layout.render(&msgs, true, &mut slots).concat();
        slots.end_frame();
        // one step at 10 chars/sec over 100ms
        assert!(text_of(&lines).contains("\na\n"));
        assert!(!text_of(&lines).contains("ab"));
        assert!(layout.content_shown().take());
        assert!(slots.revealed_this_frame());
        assert!(slots.needs_frame());

        slots.begin_frame(t0 + Duration::from_millis(250), true);
        let lines = layout.render(&msgs, true, &mut slots).concat();
        slots.end_frame();
        assert!(text_of(&lines).contains("abc"));
        assert!(!text_of(&lines).contains("abcd"));
    }

    #[test]
    fn fast_forward_shows_everything() {
        let t0 = Instant::now();
        let mut slots = TerminalSlots::new(slow_pacing(), true, t0);
        let mut layout = ChatLayout::default();
        let msgs: Rc<[ChatMessage]> = vec![ChatMessage::assistant("all of it at once")].into();
        slots.begin_frame(t0, true);
        let lines = layout.render(&msgs, true, &mut slots).concat();
        assert!(text_of(&lines).contains("all of it at once"));
    }

    #[test]
    fn unrendered_turns_are_pruned() {
        let t0 = Instant::now();
        let mut slots = TerminalSlots::new(slow_pacing(), false, t0);
        let mut layout = ChatLayout::default();
        let first: Rc<[ChatMessage]> = vec![ChatMessage::assistant("a")].into();
        slots.begin_frame(t0, false);
        layout.render(&first, false, &mut slots);
        slots.end_frame();
        assert!(slots.reveal_for(0).is_some());

        let second: Rc<[ChatMessage]> = vec![ChatMessage::user_text("x")].into();
        slots.begin_frame(t0, false);
        layout.render(&second, false, &mut slots);
        slots.end_frame();
        assert!(slots.reveal_for(0).is_none());
    }

    #[test]
    fn tool_call_shows_status_and_result() {
        let t0 = Instant::now();
        let mut slots = TerminalSlots::new(slow_pacing(), false, t0);
        let mut layout = ChatLayout::default();
        let call = ToolCall::new("c1", "search").arg("query", ArgumentValue::String("rust".to_owned()));
        let msgs: Rc<[ChatMessage]> = vec![
            ChatMessage::ToolCall { tool_call: call },
            ChatMessage::ToolResponse(ToolResponse {
                name: "search".to_owned(),
                content: serde_json::json!("3 results"),
                additional_parts: Vec::new(),
                tool_call_id: "c1".to_owned(),
            }),
        ]
        .into();
        slots.begin_frame(t0, false);
        let text = text_of(&layout.render(&msgs, false, &mut slots).concat());
        assert!(text.contains("✓ search(query: \"rust\")"));
        assert!(text.contains("└ 3 results"));
    }

    #[test]
    fn footer_only_while_streaming() {
        let mut slots = TerminalSlots::new(slow_pacing(), false, Instant::now());
        slots.begin_frame(Instant::now(), false);
        assert!(slots.footer().is_none());
        slots.begin_frame(Instant::now(), true);
        assert!(slots.footer().is_some());
    }

    #[test]
    fn long_tool_results_are_truncated() {
        let long = "x".repeat(200);
        let summary = summarize(&serde_json::json!(long));
        assert_eq!(summary.chars().count(), TOOL_SUMMARY_CHARS + 1);
    }
}
