// =====
// TESTS: 5
// =====
//
// Full-frame rendering through ratatui's TestBackend.

use convo_kit::layout::RevealMode;
use convo_kit::model::ChatMessage;
use convo_kit::ui;
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::helpers::{FRAME, buffer_rows, test_app};

const WIDTH: u16 = 48;
const HEIGHT: u16 = 14;
// separator, input, footer
const CHROME_ROWS: usize = 3;

fn long_transcript(turns: usize) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    for i in 0..turns {
        messages.push(ChatMessage::user_text(format!("question {i}")));
        messages.push(ChatMessage::assistant(format!("answer {i}")));
    }
    messages.push(ChatMessage::assistant(" and the final word"));
    messages
}

fn draw_frames(
    terminal: &mut Terminal<TestBackend>,
    app: &mut convo_kit::app::App,
    mut now: Instant,
    frames: u32,
) -> Instant {
    for _ in 0..frames {
        now += FRAME;
        terminal.draw(|f| ui::render(f, app, now)).unwrap();
    }
    now
}

#[test]
fn short_transcript_sits_above_the_input() {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
    let mut app = test_app(
        vec![ChatMessage::user_text("hello"), ChatMessage::assistant("world")],
        RevealMode::Callback,
    );
    draw_frames(&mut terminal, &mut app, Instant::now(), 1);

    let rows = buffer_rows(terminal.backend().buffer());
    let body = &rows[..rows.len() - CHROME_ROWS];
    assert!(body[0].is_empty(), "short content should be bottom-aligned: {body:?}");
    let you = body.iter().position(|r| r == "You").unwrap();
    let assistant = body.iter().position(|r| r == "Assistant").unwrap();
    assert!(you < assistant);
    assert!(body[assistant + 1].contains("world"));
    assert!(rows[rows.len() - 2].starts_with('❯'));
}

#[test]
fn long_transcript_opens_at_the_newest_message() {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
    let mut app = test_app(long_transcript(20), RevealMode::Callback);
    draw_frames(&mut terminal, &mut app, Instant::now(), 300);

    assert!(app.chat.scroll().is_at_bottom());
    let rows = buffer_rows(terminal.backend().buffer());
    let body = rows[..rows.len() - CHROME_ROWS].join("\n");
    assert!(body.contains("answer 19 and the final word"), "{body}");
    assert!(!body.contains("question 0"));
}

#[test]
fn scrolling_away_shows_the_new_messages_hint() {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
    let mut app = test_app(long_transcript(20), RevealMode::Callback);
    let now = draw_frames(&mut terminal, &mut app, Instant::now(), 300);

    app.chat.user_scroll_rows(-10, now);
    let now = draw_frames(&mut terminal, &mut app, now, 3);
    assert!(!app.chat.scroll().is_at_bottom());
    let rows = buffer_rows(terminal.backend().buffer());
    assert!(rows.iter().any(|r| r.contains("new messages")));
    assert!(rows.last().unwrap().ends_with("scrolled"));

    app.chat.scroll_to_bottom();
    draw_frames(&mut terminal, &mut app, now, 300);
    let rows = buffer_rows(terminal.backend().buffer());
    assert!(!rows.iter().any(|r| r.contains("new messages")));
}

#[test]
fn streamed_reply_is_revealed_gradually_and_followed() {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
    let mut app = test_app(long_transcript(10), RevealMode::Callback);
    let now = draw_frames(&mut terminal, &mut app, Instant::now(), 300);

    app.status = convo_kit::app::AppStatus::Streaming;
    let reply = "streamed line one. streamed line two. streamed line three.";
    let mut messages = app.messages.to_vec();
    messages.push(ChatMessage::user_text("more please"));
    messages.push(ChatMessage::assistant(reply));
    app.messages = Rc::from(messages);

    let now = draw_frames(&mut terminal, &mut app, now, 2);
    let early = buffer_rows(terminal.backend().buffer()).join("\n");
    assert!(!early.contains("line three"), "reply should not appear at once");

    // the adaptive pacer catches up once its fallback chunk wait passes
    draw_frames(&mut terminal, &mut app, now + Duration::from_millis(1100), 200);
    let late = buffer_rows(terminal.backend().buffer()).join("\n");
    assert!(late.contains("line three"), "{late}");
    assert!(app.chat.scroll().is_at_bottom());
}

#[test]
fn streaming_flag_mode_follows_through_resize() {
    let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).unwrap();
    let mut app = test_app(long_transcript(10), RevealMode::StreamingFlag);
    let now = draw_frames(&mut terminal, &mut app, Instant::now(), 300);

    app.status = convo_kit::app::AppStatus::Streaming;
    let mut messages = app.messages.to_vec();
    messages.push(ChatMessage::assistant(" plus an appended tail"));
    app.messages = Rc::from(messages);
    // the tail is paced against the turn's age, then followed by resize events alone
    draw_frames(&mut terminal, &mut app, now, 400);

    assert!(app.chat.scroll().is_at_bottom());
    let body = buffer_rows(terminal.backend().buffer()).join("\n");
    assert!(body.contains("appended tail"), "{body}");
}
