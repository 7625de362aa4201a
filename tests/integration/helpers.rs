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

use convo_kit::app::{App, AppOptions};
use convo_kit::config::KitConfig;
use convo_kit::layout::RevealMode;
use convo_kit::model::ChatMessage;
use convo_kit::reveal::{FixedRateConfig, Pacing};
use convo_kit::scroll::{PointerState, StickyConfig, StickyScroll, VirtualViewport};
use ratatui::buffer::Buffer;
use std::time::{Duration, Instant};

pub const FRAME: Duration = Duration::from_millis(16);

/// Controller over a `viewport`-high surface showing the bottom of
/// `content`, mounted and settled so it is pinned and idle.
pub fn pinned_controller(
    content: f64,
    viewport: f64,
    pointer: PointerState,
) -> (StickyScroll<VirtualViewport>, Instant) {
    let mut host = VirtualViewport::new(viewport);
    host.set_content_height(content);
    host.user_scroll_to(content - viewport);
    let mut controller = StickyScroll::new(host, pointer, StickyConfig::default());
    let t0 = Instant::now();
    controller.mount(t0);
    let now = run_frames(&mut controller, t0, 40);
    assert!(controller.is_at_bottom());
    (controller, now)
}

pub fn run_frames(c: &mut StickyScroll<VirtualViewport>, mut now: Instant, frames: u32) -> Instant {
    for _ in 0..frames {
        now += FRAME;
        c.pump(now);
        c.tick(now);
    }
    now
}

/// Ten characters per 100ms step, with no backlog speed-up.
pub fn steady_pacing() -> Pacing {
    Pacing::fixed(FixedRateConfig {
        interval_ms: 100,
        catch_up_window_ms: 1_000_000,
        min_chars_per_sec: 100.0,
    })
}

pub fn test_app(transcript: Vec<ChatMessage>, mode: RevealMode) -> App {
    let options = AppOptions { mode, fast_forward: false, chunk_delay: Duration::ZERO };
    App::new(&KitConfig::default(), options, transcript, Instant::now())
}

/// Rows of a rendered buffer with trailing blanks trimmed.
pub fn buffer_rows(buffer: &Buffer) -> Vec<String> {
    let area = buffer.area;
    (area.top()..area.bottom())
        .map(|y| {
            let mut row = String::new();
            for x in area.left()..area.right() {
                if let Some(cell) = buffer.cell((x, y)) {
                    row.push_str(cell.symbol());
                }
            }
            row.trim_end().to_owned()
        })
        .collect()
}
