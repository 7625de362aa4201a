// =====
// TESTS: 4
// =====
//
// Reveal scheduler driving the sticky-scroll controller, frame by frame,
// the way a host wires them together.

use convo_kit::layout::ContentShown;
use convo_kit::reveal::RevealScheduler;
use convo_kit::scroll::{PointerState, SelectionSpan, StickyScroll, VirtualViewport};
use std::time::Instant;

use crate::helpers::{FRAME, pinned_controller, run_frames, steady_pacing};

const PX_PER_CHAR: f64 = 4.0;
const BASE_CONTENT: f64 = 1000.0;

struct Harness {
    controller: StickyScroll<VirtualViewport>,
    reveal: RevealScheduler,
    shown: ContentShown,
    now: Instant,
}

impl Harness {
    fn new(pointer: PointerState) -> Self {
        let (controller, now) = pinned_controller(BASE_CONTENT, 100.0, pointer);
        let shown = ContentShown::default();
        let notify = shown.clone();
        let reveal = RevealScheduler::new(steady_pacing(), now).with_content_shown(move |_| notify.notify());
        Self { controller, reveal, shown, now }
    }

    /// One host frame: reveal, relayout, notify, animate. Returns whether
    /// new text became visible.
    #[allow(clippy::cast_precision_loss)]
    fn frame(&mut self) -> bool {
        self.now += FRAME;
        self.reveal.tick(self.now);
        let chars = self.reveal.state().shown_chars() as f64;
        self.controller.host_mut().set_content_height(BASE_CONTENT + chars * PX_PER_CHAR);
        self.controller.pump(self.now);
        let shown = self.shown.take();
        if shown {
            self.controller.on_content_shown();
        }
        self.controller.tick(self.now);
        shown
    }
}

#[test]
fn pinned_view_follows_every_reveal_step() {
    let mut h = Harness::new(PointerState::new());
    h.reveal.update(&"x".repeat(100), true, h.now);

    let mut steps = 0;
    let mut last_offset = h.controller.host().offset();
    for _ in 0..200 {
        let shown = h.frame();
        let offset = h.controller.host().offset();
        assert!(offset >= last_offset, "scrolled backwards while following");
        last_offset = offset;
        if shown {
            steps += 1;
            assert!(h.controller.is_at_bottom());
            assert!(h.controller.is_animating(), "reveal step {steps} did not start a scroll");
        }
    }

    assert_eq!(steps, 10);
    assert_eq!(h.reveal.state().remaining_chars(), 0);
    assert!(h.controller.is_at_bottom());
    assert!(!h.controller.is_animating());
    assert!((h.controller.host().offset() - h.controller.host().max_offset()).abs() < f64::EPSILON);
}

#[test]
fn scrolling_up_mid_stream_stops_following() {
    let mut h = Harness::new(PointerState::new());
    h.reveal.update(&"x".repeat(100), true, h.now);
    // steps land on frames 1, 7 and 13; wheel in the quiet gap before 13
    for _ in 0..10 {
        h.frame();
    }

    h.controller.host_mut().user_wheel(-300.0);
    h.frame();
    h.frame();
    assert!(!h.controller.is_at_bottom());

    let parked = h.controller.host().offset();
    for _ in 0..100 {
        h.frame();
    }
    assert_eq!(h.reveal.state().remaining_chars(), 0);
    assert!((h.controller.host().offset() - parked).abs() < f64::EPSILON);
    assert!(h.controller.distance_to_bottom().unwrap() > 70.0);
}

#[test]
fn selecting_text_holds_the_view_still() {
    let pointer = PointerState::new();
    let mut h = Harness::new(pointer.clone());
    let before = h.controller.host().offset();

    pointer.press();
    pointer.select(SelectionSpan::new(920.0, 960.0));
    h.reveal.update(&"x".repeat(50), true, h.now);
    for _ in 0..60 {
        h.frame();
    }

    assert!(!h.controller.is_at_bottom());
    assert!((h.controller.host().offset() - before).abs() < f64::EPSILON);

    // releasing the mouse does not re-pin on its own; the user scrolls back
    pointer.release();
    pointer.clear_selection();
    h.controller.scroll_to_bottom();
    h.now = run_frames(&mut h.controller, h.now, 200);
    assert!(h.controller.is_at_bottom());
    assert!((h.controller.host().offset() - h.controller.host().max_offset()).abs() < f64::EPSILON);
}

#[test]
fn fast_forward_jumps_and_still_follows() {
    let mut h = Harness::new(PointerState::new());
    h.reveal.fast_forward();
    h.reveal.update(&"y".repeat(80), true, h.now);
    assert_eq!(h.reveal.state().remaining_chars(), 0);

    // the first frame picks up the whole growth at once
    h.controller.host_mut().set_content_height(BASE_CONTENT + 80.0 * PX_PER_CHAR);
    h.controller.pump(h.now);
    assert!(h.shown.take());
    h.controller.on_content_shown();
    h.now = run_frames(&mut h.controller, h.now, 200);

    assert!(h.controller.is_at_bottom());
    assert!(h.controller.distance_to_bottom().unwrap().abs() < f64::EPSILON);
}
