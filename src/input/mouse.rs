//! Mouse Classifier
//!
//! One checker chain per (button class, edge). The active trigger selects
//! which chain handles the left/right pair and which handles the single
//! buttons; a trigger change swaps the handler mode atomically and the next
//! delivered event uses the new chains.

use super::waiter::Waiter;
use super::{Check, Decision, LastFlags};
use crate::config::{ConfigStore, ModeObserver};
use crate::inject::{self, Resend};
use crate::platform::{CursorHost, KeyState};
use crate::scroll::ScrollCtl;
use crate::types::{
    is_xbutton1, MouseClick, MouseEvent, MouseEventKind, PointerInfo, Trigger, VK_CONTROL,
    VK_ESCAPE, VK_MENU, VK_SHIFT,
};
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Which chain family the current trigger selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum HandlerMode {
    Double = 0,
    Single = 1,
    Drag = 2,
    Passive = 3,
}

impl HandlerMode {
    fn of(trigger: Trigger) -> Self {
        if trigger.is_double() {
            HandlerMode::Double
        } else if trigger.is_single() {
            HandlerMode::Single
        } else if trigger.is_drag() {
            HandlerMode::Drag
        } else {
            HandlerMode::Passive
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => HandlerMode::Double,
            1 => HandlerMode::Single,
            2 => HandlerMode::Drag,
            _ => HandlerMode::Passive,
        }
    }
}

#[derive(Debug, Default)]
struct DragState {
    tracking: bool,
    pre_scroll: bool,
    dragged: bool,
    start: (i32, i32),
    moved: (i32, i32),
}

type Checker = fn(&MouseDispatch, &MouseEvent) -> Check;

/// The mouse event classifier.
pub struct MouseDispatch {
    config: Arc<ConfigStore>,
    flags: Arc<LastFlags>,
    scroll: Arc<ScrollCtl>,
    waiter: Arc<Waiter>,
    resend: Arc<Resend>,
    cursor: Arc<dyn CursorHost>,
    keys: Arc<dyn KeyState>,
    mode: AtomicU8,
    last_event: Mutex<MouseEventKind>,
    // Last injected resend seen per side, for ordering repair.
    last_resend_left: Mutex<MouseEventKind>,
    last_resend_right: Mutex<MouseEventKind>,
    resent_down_up: AtomicBool,
    second_trigger_up: AtomicBool,
    drag: Mutex<DragState>,
}

impl MouseDispatch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<ConfigStore>,
        flags: Arc<LastFlags>,
        scroll: Arc<ScrollCtl>,
        waiter: Arc<Waiter>,
        resend: Arc<Resend>,
        cursor: Arc<dyn CursorHost>,
        keys: Arc<dyn KeyState>,
    ) -> Self {
        let mode = HandlerMode::of(config.trigger());
        MouseDispatch {
            config,
            flags,
            scroll,
            waiter,
            resend,
            cursor,
            keys,
            mode: AtomicU8::new(mode as u8),
            last_event: Mutex::new(MouseEventKind::NonEvent),
            last_resend_left: Mutex::new(MouseEventKind::NonEvent),
            last_resend_right: Mutex::new(MouseEventKind::NonEvent),
            resent_down_up: AtomicBool::new(false),
            second_trigger_up: AtomicBool::new(false),
            drag: Mutex::new(DragState::default()),
        }
    }

    /// Classify one event and decide pass/suppress.
    pub fn handle(&self, me: MouseEvent) -> Decision {
        match me.kind {
            MouseEventKind::Move => self.on_move(me),
            k if k.is_left() || k.is_right() => self.run(self.lr_chain(k.is_down()), &me),
            k if k.is_down() => self.run(self.single_chain(true), &me),
            k if k.is_up() => self.run(self.single_chain(false), &me),
            _ => Decision::Pass,
        }
    }

    /// Classify an X button event, resolving which X button from the data
    /// word.
    pub fn handle_x(&self, down: bool, info: PointerInfo) -> Decision {
        let kind = match (is_xbutton1(info.mouse_data), down) {
            (true, true) => MouseEventKind::X1Down,
            (true, false) => MouseEventKind::X1Up,
            (false, true) => MouseEventKind::X2Down,
            (false, false) => MouseEventKind::X2Up,
        };
        self.handle(MouseEvent::new(kind, info))
    }

    fn mode(&self) -> HandlerMode {
        HandlerMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    fn lr_chain(&self, down: bool) -> &'static [Checker] {
        match (self.mode(), down) {
            (HandlerMode::Double, true) => LR_DOWN,
            (HandlerMode::Double, false) => LR_UP,
            (HandlerMode::Drag, true) => DRAG_DOWN,
            (HandlerMode::Drag, false) => DRAG_UP,
            (_, true) => NONE_DOWN,
            (_, false) => NONE_UP,
        }
    }

    fn single_chain(&self, down: bool) -> &'static [Checker] {
        match (self.mode(), down) {
            (HandlerMode::Single, true) => SINGLE_DOWN,
            (HandlerMode::Single, false) => SINGLE_UP,
            (HandlerMode::Drag, true) => DRAG_DOWN,
            (HandlerMode::Drag, false) => DRAG_UP,
            (_, true) => NONE_DOWN,
            (_, false) => NONE_UP,
        }
    }

    fn run(&self, chain: &[Checker], me: &MouseEvent) -> Decision {
        for checker in chain {
            match checker(self, me) {
                Check::Pass => return Decision::Pass,
                Check::Suppress => return Decision::Suppress,
                Check::Continue => {}
            }
        }
        Decision::Pass
    }

    /// Pointer motion: feeds drag tracking inside (or entering) scroll mode,
    /// otherwise may resolve a pending chord.
    fn on_move(&self, me: MouseEvent) -> Decision {
        let pre_scroll = self.drag.lock().pre_scroll;
        if self.scroll.is_scroll_mode() || pre_scroll {
            self.drag_track(&me.info);
            return Decision::Suppress;
        }
        if !me.is_injected() && self.waiter.offer(&me) {
            return Decision::Suppress;
        }
        Decision::Pass
    }

    fn drag_track(&self, info: &PointerInfo) {
        let threshold = self.config.drag_threshold();
        {
            let mut drag = self.drag.lock();
            if !drag.tracking {
                return;
            }
            drag.moved.0 += (info.pt.0 - drag.start.0).abs();
            drag.moved.1 += (info.pt.1 - drag.start.1).abs();
            if drag.moved.0 <= threshold && drag.moved.1 <= threshold {
                return;
            }
            drag.tracking = false;
            drag.pre_scroll = false;
            drag.dragged = true;
        }
        let settings = self.config.snapshot();
        self.scroll.start_scroll(info);
        if settings.cursor_change && !settings.vh_adjuster_active() {
            self.cursor.change_vertical();
        }
    }

    fn is_trigger_event(&self, kind: MouseEventKind) -> bool {
        self.config.trigger() == kind.trigger()
    }

    fn is_drag_trigger_event(&self, kind: MouseEventKind) -> bool {
        self.config.trigger() == kind.drag_trigger()
    }

    fn last_resend_slot(&self, me: &MouseEvent) -> Option<&Mutex<MouseEventKind>> {
        if me.kind.is_left() {
            Some(&self.last_resend_left)
        } else if me.kind.is_right() {
            Some(&self.last_resend_right)
        } else {
            None
        }
    }

    fn correct_resend_order(&self, me: &MouseEvent) -> bool {
        let Some(slot) = self.last_resend_slot(me) else {
            return true;
        };
        let pre = *slot.lock();
        // An UP with no preceding DOWN on this side is out of order.
        if pre == MouseEventKind::NonEvent && me.kind.is_up() {
            return false;
        }
        if pre.is_up() && me.kind.is_up() {
            return false;
        }
        true
    }

    fn record_resend(&self, me: &MouseEvent) {
        if let Some(slot) = self.last_resend_slot(me) {
            *slot.lock() = me.kind;
        }
    }

    /// Full pipeline reset: classifiers, latches, waiter and scroll mode.
    fn full_reset(&self) {
        debug!("escape pressed, resetting input state");
        self.config.notify_state_reset();
        self.flags.clear();
        self.waiter.cancel();
        self.scroll.exit_scroll();
    }

    // ---- checkers ----

    fn skip_resend_lr(&self, me: &MouseEvent) -> Check {
        if !me.is_injected() {
            return Check::Continue;
        }
        if inject::is_resend_click(me) {
            return Check::Pass;
        }
        if inject::is_resend(me) {
            if self.resent_down_up.swap(false, Ordering::AcqRel) {
                if !self.correct_resend_order(me) {
                    // The OS delivered our UP before its DOWN; give the
                    // in-flight DOWN a moment, then re-emit the UP.
                    thread::sleep(Duration::from_millis(1));
                    self.resend.resend_up(me);
                    return Check::Suppress;
                }
            }
            self.record_resend(me);
            return Check::Pass;
        }
        // Some other program's injected event.
        Check::Pass
    }

    fn skip_resend_single(&self, me: &MouseEvent) -> Check {
        if me.is_injected() {
            Check::Pass
        } else {
            Check::Continue
        }
    }

    fn check_escape(&self, _me: &MouseEvent) -> Check {
        if self.keys.is_down(VK_ESCAPE) {
            self.full_reset();
            return Check::Pass;
        }
        Check::Continue
    }

    fn skip_first_up(&self, _me: &MouseEvent) -> Check {
        if *self.last_event.lock() == MouseEventKind::NonEvent {
            return Check::Pass;
        }
        Check::Continue
    }

    fn check_same_last(&self, me: &MouseEvent) -> Check {
        let mut last = self.last_event.lock();
        if me.kind == *last {
            return Check::Pass;
        }
        *last = me.kind;
        Check::Continue
    }

    fn reset_last_flags_lr(&self, me: &MouseEvent) -> Check {
        self.flags.reset_lr(me);
        Check::Continue
    }

    fn check_exit_scroll_down(&self, me: &MouseEvent) -> Check {
        if self.scroll.is_released() {
            self.scroll.exit_scroll();
            self.flags.set_suppressed(me);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn pass_pressed_scroll(&self, me: &MouseEvent) -> Check {
        if self.scroll.is_pressed() {
            self.flags.set_passed(me);
            return Check::Pass;
        }
        Check::Continue
    }

    fn check_exit_scroll_up(&self, me: &MouseEvent) -> Check {
        if self.scroll.is_pressed() {
            if self.scroll.locktime_expired(me.info.time) {
                self.scroll.exit_scroll();
            } else {
                self.scroll.set_released();
            }
            return Check::Suppress;
        }
        Check::Continue
    }

    // LR exit is two-phase: the chord holds two buttons, so the first UP is
    // swallowed and only the second one decides.
    fn check_exit_scroll_up_lr(&self, me: &MouseEvent) -> Check {
        if self.scroll.is_pressed() {
            let second = self.second_trigger_up.load(Ordering::Acquire);
            if second {
                if self.scroll.locktime_expired(me.info.time) {
                    self.scroll.exit_scroll();
                } else {
                    self.scroll.set_released();
                }
            }
            self.second_trigger_up.store(!second, Ordering::Release);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_starting_scroll(&self, _me: &MouseEvent) -> Check {
        if self.scroll.is_starting() {
            thread::sleep(Duration::from_millis(1));
            let second = self.second_trigger_up.load(Ordering::Acquire);
            if second {
                self.scroll.exit_scroll();
            }
            self.second_trigger_up.store(!second, Ordering::Release);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn offer_event_waiter(&self, me: &MouseEvent) -> Check {
        if self.waiter.offer(me) {
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_suppressed_down(&self, me: &MouseEvent) -> Check {
        if self.flags.get_reset_suppressed(me) {
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_resent_down(&self, me: &MouseEvent) -> Check {
        if self.flags.get_reset_resent(me) {
            self.resent_down_up.store(true, Ordering::Release);
            self.resend.resend_up(me);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_passed_down(&self, me: &MouseEvent) -> Check {
        if self.flags.get_reset_passed(me) {
            return Check::Pass;
        }
        Check::Continue
    }

    fn check_trigger_wait_start(&self, me: &MouseEvent) -> Check {
        if self.config.trigger() == Trigger::Lr || self.is_trigger_event(me.kind) {
            if self.waiter.start(me) {
                return Check::Suppress;
            }
        }
        Check::Continue
    }

    fn check_key_send_middle(&self, me: &MouseEvent) -> Check {
        if self.config.send_middle_click()
            && (self.keys.is_down(VK_SHIFT)
                || self.keys.is_down(VK_CONTROL)
                || self.keys.is_down(VK_MENU))
        {
            self.resend.resend_click(MouseClick::Middle, &me.info);
            self.flags.set_suppressed(me);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_trigger_scroll_start(&self, me: &MouseEvent) -> Check {
        if self.is_trigger_event(me.kind) {
            self.scroll.start_scroll(&me.info);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn pass_not_trigger(&self, me: &MouseEvent) -> Check {
        if !self.is_trigger_event(me.kind) {
            return Check::Pass;
        }
        Check::Continue
    }

    fn pass_not_drag_trigger(&self, me: &MouseEvent) -> Check {
        if !self.is_drag_trigger_event(me.kind) {
            return Check::Pass;
        }
        Check::Continue
    }

    fn start_scroll_drag(&self, me: &MouseEvent) -> Check {
        let mut drag = self.drag.lock();
        drag.tracking = true;
        drag.pre_scroll = true;
        drag.dragged = false;
        drag.start = me.info.pt;
        drag.moved = (0, 0);
        Check::Suppress
    }

    fn continue_scroll_drag(&self, _me: &MouseEvent) -> Check {
        if self.config.dragged_lock() && self.drag.lock().dragged {
            self.scroll.set_released();
            return Check::Suppress;
        }
        Check::Continue
    }

    fn exit_and_resend_drag(&self, me: &MouseEvent) -> Check {
        let dragged = {
            let mut drag = self.drag.lock();
            drag.tracking = false;
            drag.pre_scroll = false;
            drag.dragged
        };
        self.scroll.exit_scroll();
        if !dragged {
            // The press never moved: deliver it as an ordinary click.
            if let Some(click) = MouseClick::from_up(me.kind) {
                self.resend.resend_click(click, &me.info);
            }
        }
        Check::Suppress
    }

    fn end_illegal(&self, _me: &MouseEvent) -> Check {
        Check::Suppress
    }
}

impl ModeObserver for MouseDispatch {
    fn trigger_changed(&self, new: Trigger) {
        self.mode.store(HandlerMode::of(new) as u8, Ordering::Release);
        *self.last_event.lock() = MouseEventKind::NonEvent;
    }

    fn state_reset(&self) {
        *self.last_event.lock() = MouseEventKind::NonEvent;
        *self.last_resend_left.lock() = MouseEventKind::NonEvent;
        *self.last_resend_right.lock() = MouseEventKind::NonEvent;
        self.resent_down_up.store(false, Ordering::Release);
        self.second_trigger_up.store(false, Ordering::Release);
        *self.drag.lock() = DragState::default();
    }
}

// Chain tables, in checker priority order.

const LR_DOWN: &[Checker] = &[
    MouseDispatch::skip_resend_lr,
    MouseDispatch::check_same_last,
    MouseDispatch::reset_last_flags_lr,
    MouseDispatch::check_exit_scroll_down,
    MouseDispatch::pass_pressed_scroll,
    MouseDispatch::offer_event_waiter,
    MouseDispatch::check_trigger_wait_start,
];

const LR_UP: &[Checker] = &[
    MouseDispatch::skip_resend_lr,
    MouseDispatch::check_escape,
    MouseDispatch::skip_first_up,
    MouseDispatch::check_same_last,
    MouseDispatch::check_passed_down,
    MouseDispatch::check_resent_down,
    MouseDispatch::check_exit_scroll_up_lr,
    MouseDispatch::check_starting_scroll,
    MouseDispatch::offer_event_waiter,
    MouseDispatch::check_suppressed_down,
];

const SINGLE_DOWN: &[Checker] = &[
    MouseDispatch::skip_resend_single,
    MouseDispatch::check_same_last,
    MouseDispatch::check_exit_scroll_down,
    MouseDispatch::pass_not_trigger,
    MouseDispatch::check_key_send_middle,
    MouseDispatch::check_trigger_scroll_start,
    MouseDispatch::end_illegal,
];

const SINGLE_UP: &[Checker] = &[
    MouseDispatch::skip_resend_single,
    MouseDispatch::check_escape,
    MouseDispatch::skip_first_up,
    MouseDispatch::check_same_last,
    MouseDispatch::check_suppressed_down,
    MouseDispatch::pass_not_trigger,
    MouseDispatch::check_exit_scroll_up,
    MouseDispatch::end_illegal,
];

const DRAG_DOWN: &[Checker] = &[
    MouseDispatch::skip_resend_single,
    MouseDispatch::check_same_last,
    MouseDispatch::check_exit_scroll_down,
    MouseDispatch::pass_not_drag_trigger,
    MouseDispatch::start_scroll_drag,
];

const DRAG_UP: &[Checker] = &[
    MouseDispatch::skip_resend_single,
    MouseDispatch::check_escape,
    MouseDispatch::skip_first_up,
    MouseDispatch::check_same_last,
    MouseDispatch::check_suppressed_down,
    MouseDispatch::pass_not_drag_trigger,
    MouseDispatch::continue_scroll_drag,
    MouseDispatch::exit_and_resend_drag,
];

const NONE_DOWN: &[Checker] = &[MouseDispatch::check_exit_scroll_down];

const NONE_UP: &[Checker] = &[
    MouseDispatch::check_escape,
    MouseDispatch::check_suppressed_down,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::inject::{flags as evflags, InjectEvent, InputQueue, RESEND_CLICK_TAG, RESEND_TAG};
    use crate::platform::{NullCursorHost, NullMotionSource};
    use crate::scroll::ScrollMode;
    use std::collections::HashSet;
    use std::time::Instant;

    struct TestKeys {
        down: Mutex<HashSet<u16>>,
    }

    impl TestKeys {
        fn new() -> Self {
            TestKeys {
                down: Mutex::new(HashSet::new()),
            }
        }
        fn press(&self, vk: u16) {
            self.down.lock().insert(vk);
        }
        fn release(&self, vk: u16) {
            self.down.lock().remove(&vk);
        }
    }

    impl KeyState for TestKeys {
        fn is_down(&self, vk: u16) -> bool {
            self.down.lock().contains(&vk)
        }
    }

    struct Harness {
        dispatch: Arc<MouseDispatch>,
        config: Arc<ConfigStore>,
        scroll: Arc<ScrollCtl>,
        flags: Arc<LastFlags>,
        queue: Arc<InputQueue>,
        keys: Arc<TestKeys>,
    }

    fn harness(settings: Settings) -> Harness {
        let config = Arc::new(ConfigStore::new(settings));
        let queue = Arc::new(InputQueue::new(256));
        let resend = Arc::new(Resend::new(queue.clone()));
        let flags = Arc::new(LastFlags::new());
        let scroll = Arc::new(ScrollCtl::new(
            config.clone(),
            resend.clone(),
            Arc::new(NullCursorHost),
            Arc::new(NullMotionSource),
        ));
        let waiter = Arc::new(Waiter::new(
            config.clone(),
            flags.clone(),
            scroll.clone(),
            resend.clone(),
        ));
        let keys = Arc::new(TestKeys::new());
        let dispatch = Arc::new(MouseDispatch::new(
            config.clone(),
            flags.clone(),
            scroll.clone(),
            waiter,
            resend,
            Arc::new(NullCursorHost),
            keys.clone(),
        ));
        config.register_observer(dispatch.clone());
        Harness {
            dispatch,
            config,
            scroll,
            flags,
            queue,
            keys,
        }
    }

    fn settings_with(trigger: Trigger) -> Settings {
        let mut s = Settings::default();
        s.trigger = trigger;
        s.accel_enabled = false;
        s
    }

    fn ev(kind: MouseEventKind, x: i32, y: i32, t: u32) -> MouseEvent {
        MouseEvent::new(kind, PointerInfo::at(x, y, t))
    }

    fn drain(queue: &InputQueue) -> Vec<InjectEvent> {
        let batch = queue.drain_batch(Duration::from_millis(200));
        queue.reclaim(batch.len());
        batch
    }

    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_lr_chord_enters_scroll_mode() {
        let h = harness(settings_with(Trigger::Lr));
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftDown, 0, 0, 0)),
            Decision::Suppress
        );
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::RightDown, 0, 0, 100)),
            Decision::Suppress
        );
        assert!(wait_for(|| h.scroll.is_scroll_mode()));
        // Both paired UPs are swallowed by the starting/exit logic.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftUp, 0, 0, 120)),
            Decision::Suppress
        );
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::RightUp, 0, 0, 130)),
            Decision::Suppress
        );
    }

    #[test]
    fn test_lr_timeout_resends_through_down() {
        let mut s = settings_with(Trigger::Lr);
        s.poll_timeout = 50;
        let h = harness(s);
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftDown, 5, 5, 0)),
            Decision::Suppress
        );
        let out = drain(&h.queue);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, evflags::LEFT_DOWN);
        assert_eq!(out[0].extra, RESEND_TAG);

        // The injected DOWN re-enters the hook and passes.
        let mut injected = ev(MouseEventKind::LeftDown, 5, 5, 60);
        injected.info.flags = 1;
        injected.info.extra = RESEND_TAG;
        assert_eq!(h.dispatch.handle(injected), Decision::Pass);

        // The later hardware UP is converted to an injected UP.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftUp, 5, 5, 300)),
            Decision::Suppress
        );
        let out = drain(&h.queue);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, evflags::LEFT_UP);

        let mut injected_up = ev(MouseEventKind::LeftUp, 5, 5, 310);
        injected_up.info.flags = 1;
        injected_up.info.extra = RESEND_TAG;
        assert_eq!(h.dispatch.handle(injected_up), Decision::Pass);
    }

    #[test]
    fn test_single_middle_trigger_cycle() {
        let h = harness(settings_with(Trigger::Middle));
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::MiddleDown, 0, 0, 1000)),
            Decision::Suppress
        );
        assert!(h.scroll.is_pressed());

        // UP before the lock time releases but stays in scroll mode.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::MiddleUp, 0, 0, 1100)),
            Decision::Suppress
        );
        assert!(h.scroll.is_released());
        assert!(h.scroll.is_scroll_mode());

        // The next DOWN exits scroll mode, suppressed.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::MiddleDown, 0, 0, 1500)),
            Decision::Suppress
        );
        assert_eq!(h.scroll.mode(), ScrollMode::Idle);
        // And its paired UP is swallowed via the suppressed latch.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::MiddleUp, 0, 0, 1600)),
            Decision::Suppress
        );
    }

    #[test]
    fn test_single_up_after_locktime_exits() {
        let h = harness(settings_with(Trigger::Middle));
        h.dispatch.handle(ev(MouseEventKind::MiddleDown, 0, 0, 1000));
        assert!(h.scroll.is_pressed());
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::MiddleUp, 0, 0, 1300)),
            Decision::Suppress
        );
        assert_eq!(h.scroll.mode(), ScrollMode::Idle);
    }

    #[test]
    fn test_non_trigger_buttons_pass() {
        let h = harness(settings_with(Trigger::Middle));
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::X1Down, 0, 0, 0)),
            Decision::Pass
        );
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::X1Up, 0, 0, 10)),
            Decision::Pass
        );
    }

    #[test]
    fn test_drag_trigger_with_lock() {
        let mut s = settings_with(Trigger::LeftDrag);
        s.dragged_lock = true;
        s.drag_threshold = 10;
        let h = harness(s);

        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftDown, 0, 0, 0)),
            Decision::Suppress
        );
        assert!(!h.scroll.is_scroll_mode());

        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::Move, 12, 0, 10)),
            Decision::Suppress
        );
        assert!(h.scroll.is_scroll_mode());

        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftUp, 12, 0, 20)),
            Decision::Suppress
        );
        assert_eq!(h.scroll.mode(), ScrollMode::Released);

        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftDown, 12, 0, 400)),
            Decision::Suppress
        );
        assert_eq!(h.scroll.mode(), ScrollMode::Idle);
    }

    #[test]
    fn test_drag_without_motion_resends_click() {
        let h = harness(settings_with(Trigger::RightDrag));
        h.dispatch.handle(ev(MouseEventKind::RightDown, 3, 3, 0));
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::RightUp, 3, 3, 10)),
            Decision::Suppress
        );
        let out = drain(&h.queue);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].flags, evflags::RIGHT_DOWN);
        assert_eq!(out[1].flags, evflags::RIGHT_UP);
        assert!(out.iter().all(|e| e.extra == RESEND_CLICK_TAG));
    }

    #[test]
    fn test_escape_resets_everything() {
        let h = harness(settings_with(Trigger::Middle));
        h.dispatch.handle(ev(MouseEventKind::MiddleDown, 0, 0, 0));
        assert!(h.scroll.is_scroll_mode());
        h.flags.set_suppressed(&ev(MouseEventKind::LeftDown, 0, 0, 0));

        h.keys.press(VK_ESCAPE);
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::MiddleUp, 0, 0, 50)),
            Decision::Pass
        );
        h.keys.release(VK_ESCAPE);

        assert_eq!(h.scroll.mode(), ScrollMode::Idle);
        assert!(!h
            .flags
            .get_reset_suppressed(&ev(MouseEventKind::LeftUp, 0, 0, 0)));
    }

    #[test]
    fn test_resend_order_repair() {
        let mut s = settings_with(Trigger::Lr);
        s.poll_timeout = 50;
        let h = harness(s);

        // Chord start that times out: the DOWN is resent and latched resent.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftDown, 0, 0, 0)),
            Decision::Suppress
        );
        let out = drain(&h.queue);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, evflags::LEFT_DOWN);

        // The hardware UP converts into an injected UP.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftUp, 0, 0, 300)),
            Decision::Suppress
        );
        drain(&h.queue);

        // The injected UP re-enters before its DOWN was ever observed:
        // illegal order, repaired with a fresh injected UP.
        let mut injected_up = ev(MouseEventKind::LeftUp, 0, 0, 320);
        injected_up.info.flags = 1;
        injected_up.info.extra = RESEND_TAG;
        assert_eq!(h.dispatch.handle(injected_up), Decision::Suppress);
        let out = drain(&h.queue);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, evflags::LEFT_UP);
        assert_eq!(out[0].extra, RESEND_TAG);
    }

    #[test]
    fn test_send_middle_click_with_modifier() {
        let mut s = settings_with(Trigger::X1);
        s.send_middle_click = true;
        let h = harness(s);
        h.keys.press(VK_SHIFT);
        let info = PointerInfo {
            pt: (4, 4),
            mouse_data: 0x0001_0000,
            ..Default::default()
        };
        assert_eq!(h.dispatch.handle_x(true, info), Decision::Suppress);
        h.keys.release(VK_SHIFT);
        let out = drain(&h.queue);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].flags, evflags::MIDDLE_DOWN);
        assert_eq!(out[1].flags, evflags::MIDDLE_UP);
    }

    #[test]
    fn test_resend_click_passes_back_through() {
        let h = harness(settings_with(Trigger::Lr));
        let mut click = ev(MouseEventKind::LeftDown, 0, 0, 0);
        click.info.flags = 2;
        click.info.extra = RESEND_CLICK_TAG;
        assert_eq!(h.dispatch.handle(click), Decision::Pass);
    }

    #[test]
    fn test_trigger_change_swaps_handler_mode() {
        let h = harness(settings_with(Trigger::Lr));
        h.config.set_trigger(Trigger::Middle);
        // Left button is now passive: plain DOWN passes.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftDown, 0, 0, 0)),
            Decision::Pass
        );
        // Middle button now triggers.
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::MiddleDown, 0, 0, 0)),
            Decision::Suppress
        );
        assert!(h.scroll.is_scroll_mode());
    }

    #[test]
    fn test_move_ignored_outside_scroll_and_wait() {
        let h = harness(settings_with(Trigger::Lr));
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::Move, 5, 5, 0)),
            Decision::Pass
        );
    }

    #[test]
    fn test_injected_move_never_offered() {
        let mut s = settings_with(Trigger::Lr);
        s.poll_timeout = 50;
        let h = harness(s);
        assert_eq!(
            h.dispatch.handle(ev(MouseEventKind::LeftDown, 0, 0, 0)),
            Decision::Suppress
        );
        let mut mv = ev(MouseEventKind::Move, 1, 1, 10);
        mv.info.flags = 1;
        // Injected motion may not resolve the chord; it passes through.
        assert_eq!(h.dispatch.handle(mv), Decision::Pass);
        // The pending DOWN still times out on its own.
        let out = drain(&h.queue);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].extra, RESEND_TAG);
    }

    #[test]
    fn test_x2_maps_from_mouse_data() {
        let h = harness(settings_with(Trigger::X2));
        let info = PointerInfo {
            pt: (0, 0),
            mouse_data: 0x0002_0000,
            ..Default::default()
        };
        assert_eq!(h.dispatch.handle_x(true, info), Decision::Suppress);
        assert!(h.scroll.is_scroll_mode());
    }
}
