//! Wheel Output Engine
//!
//! Per-session transform pipeline from raw pointer deltas to injected wheel
//! events. A session is built from a settings snapshot when scroll mode is
//! entered and dropped on exit. Direction decisions use the accumulated
//! deltas; emission magnitude and sign use the instantaneous delta.

use super::accel::AccelTable;
use crate::config::Settings;
use crate::inject::Resend;
use crate::platform::CursorHost;
use crate::types::{MoveDirection, VhDirection, VhMethod};

/// Real-wheel counters: emit one fixed-magnitude step per `*_move` of
/// accumulated motion.
#[derive(Debug, Clone)]
struct RealWheel {
    wheel_delta: i32,
    v_move: i32,
    h_move: i32,
    quick_turn: bool,
    vw_count: i32,
    hw_count: i32,
    v_last: MoveDirection,
    h_last: MoveDirection,
}

impl RealWheel {
    fn new(s: &Settings) -> Self {
        // quick_first preloads the counters so the very first delta emits.
        let (vw, hw) = if s.quick_first {
            (s.v_wheel_move, s.h_wheel_move)
        } else {
            (s.v_wheel_move / 2, s.h_wheel_move / 2)
        };
        RealWheel {
            wheel_delta: s.wheel_delta,
            v_move: s.v_wheel_move,
            h_move: s.h_wheel_move,
            quick_turn: s.quick_turn,
            vw_count: vw,
            hw_count: hw,
            v_last: MoveDirection::Zero,
            h_last: MoveDirection::Zero,
        }
    }
}

fn is_turn(last: MoveDirection, d: i32) -> bool {
    match last {
        MoveDirection::Zero => false,
        MoveDirection::Plus => d < 0,
        MoveDirection::Minus => d > 0,
    }
}

fn direction_of(d: i32) -> MoveDirection {
    if d > 0 {
        MoveDirection::Plus
    } else {
        MoveDirection::Minus
    }
}

/// Output routing: plain thresholds, or the VH direction adjuster.
#[derive(Debug, Clone)]
enum Routing {
    Standard {
        vertical_threshold: i32,
        horizontal_threshold: i32,
        horizontal: bool,
    },
    VhAdjust {
        method: VhMethod,
        first_min_threshold: i32,
        first_prefer_vertical: bool,
        switching_threshold: i32,
        cursor_change: bool,
        fixed: VhDirection,
        latest: VhDirection,
    },
}

/// One scroll-mode session of the wheel engine.
#[derive(Debug, Clone)]
pub struct Session {
    start: (i32, i32),
    swap: bool,
    reverse: bool,
    accel: Option<AccelTable>,
    real: Option<RealWheel>,
    routing: Routing,
}

impl Session {
    /// Capture a settings snapshot for the scroll session starting at `start`.
    pub fn new(s: &Settings, start: (i32, i32)) -> Self {
        let routing = if s.vh_adjuster_active() {
            Routing::VhAdjust {
                method: s.vh_method,
                first_min_threshold: s.first_min_threshold,
                first_prefer_vertical: s.first_prefer_vertical,
                switching_threshold: s.switching_threshold,
                cursor_change: s.cursor_change,
                fixed: VhDirection::None,
                latest: VhDirection::None,
            }
        } else {
            Routing::Standard {
                vertical_threshold: s.vertical_threshold,
                horizontal_threshold: s.horizontal_threshold,
                horizontal: s.horizontal_scroll,
            }
        };
        Session {
            start,
            swap: s.swap_scroll,
            reverse: s.reverse_scroll,
            accel: s.accel_table(),
            real: s.real_wheel_mode.then(|| RealWheel::new(s)),
            routing,
        }
    }

    /// Feed one raw delta. `acc` is the running accumulation since scroll
    /// entry (including this delta), `d` the instantaneous delta.
    pub fn feed(
        &mut self,
        mut acc: (i32, i32),
        mut d: (i32, i32),
        resend: &Resend,
        cursor: &dyn CursorHost,
    ) {
        if d.0 == 0 && d.1 == 0 {
            return;
        }
        if self.swap {
            acc = (acc.1, acc.0);
            d = (d.1, d.0);
        }

        match self.routing {
            Routing::Standard {
                vertical_threshold,
                horizontal_threshold,
                horizontal,
            } => {
                if acc.1.abs() > vertical_threshold && d.1 != 0 {
                    self.send_vertical(d.1, resend);
                }
                if horizontal && acc.0.abs() > horizontal_threshold && d.0 != 0 {
                    self.send_horizontal(d.0, resend);
                }
            }
            Routing::VhAdjust { .. } => self.feed_vh(acc, d, resend, cursor),
        }
    }

    fn feed_vh(&mut self, acc: (i32, i32), d: (i32, i32), resend: &Resend, cursor: &dyn CursorHost) {
        let locked = match self.routing {
            Routing::VhAdjust {
                method,
                first_min_threshold,
                first_prefer_vertical,
                switching_threshold,
                cursor_change,
                ref mut fixed,
                ref mut latest,
            } => {
                let (adx, ady) = (acc.0.abs(), acc.1.abs());
                let current = if *fixed == VhDirection::None {
                    *fixed = first_direction(adx, ady, first_min_threshold, first_prefer_vertical);
                    *fixed
                } else {
                    match method {
                        VhMethod::Fixed => *fixed,
                        VhMethod::Switching => switch_direction(adx, ady, switching_threshold),
                    }
                };

                if current != VhDirection::None && current != *latest {
                    if cursor_change {
                        match current {
                            VhDirection::Vertical => cursor.change_vertical(),
                            VhDirection::Horizontal => cursor.change_horizontal(),
                            VhDirection::None => {}
                        }
                    }
                    *latest = current;
                }
                *latest
            }
            Routing::Standard { .. } => return,
        };

        match locked {
            VhDirection::Vertical if d.1 != 0 => self.send_vertical(d.1, resend),
            VhDirection::Horizontal if d.0 != 0 => self.send_horizontal(d.0, resend),
            _ => {}
        }
    }

    fn send_vertical(&mut self, d: i32, resend: &Resend) {
        match self.real {
            Some(ref mut rw) => {
                rw.vw_count += d.abs();
                if rw.quick_turn && is_turn(rw.v_last, d) {
                    let delta = wheel_step(d, rw.wheel_delta, self.reverse);
                    resend.send_wheel(self.start, delta, false);
                    rw.vw_count = d.abs();
                } else if rw.vw_count >= rw.v_move {
                    let delta = wheel_step(d, rw.wheel_delta, self.reverse);
                    resend.send_wheel(self.start, delta, false);
                    rw.vw_count -= rw.v_move;
                }
                rw.v_last = direction_of(d);
            }
            None => {
                let value = apply_reverse_v(self.accelerate(d), self.reverse);
                resend.send_wheel(self.start, value, false);
            }
        }
    }

    fn send_horizontal(&mut self, d: i32, resend: &Resend) {
        match self.real {
            Some(ref mut rw) => {
                rw.hw_count += d.abs();
                if rw.quick_turn && is_turn(rw.h_last, d) {
                    let delta = -wheel_step(d, rw.wheel_delta, self.reverse);
                    resend.send_wheel(self.start, delta, true);
                    rw.hw_count = d.abs();
                } else if rw.hw_count >= rw.h_move {
                    let delta = -wheel_step(d, rw.wheel_delta, self.reverse);
                    resend.send_wheel(self.start, delta, true);
                    rw.hw_count -= rw.h_move;
                }
                rw.h_last = direction_of(d);
            }
            None => {
                let value = apply_reverse_h(self.accelerate(d), self.reverse);
                resend.send_wheel(self.start, value, true);
            }
        }
    }

    fn accelerate(&self, d: i32) -> i32 {
        match self.accel {
            Some(ref t) => t.apply(d),
            None => d,
        }
    }
}

// Vertical output flips sign unless reverse is on (natural scroll is the
// historical default: positive dy means wheel-down, a negative wheel value).
fn apply_reverse_v(d: i32, reverse: bool) -> i32 {
    if reverse {
        d
    } else {
        -d
    }
}

// Horizontal is the negation of the vertical convention.
fn apply_reverse_h(d: i32, reverse: bool) -> i32 {
    if reverse {
        -d
    } else {
        d
    }
}

// Fixed-magnitude step for real-wheel mode.
fn wheel_step(d: i32, wheel_delta: i32, reverse: bool) -> i32 {
    let step = if d > 0 { -wheel_delta } else { wheel_delta };
    if reverse {
        -step
    } else {
        step
    }
}

/// Pick the initial locked direction once either axis clears the minimum.
fn first_direction(adx: i32, ady: i32, min_threshold: i32, prefer_vertical: bool) -> VhDirection {
    if adx > min_threshold || ady > min_threshold {
        let y = if prefer_vertical { ady * 2 } else { ady };
        if y >= adx {
            VhDirection::Vertical
        } else {
            VhDirection::Horizontal
        }
    } else {
        VhDirection::None
    }
}

/// Direction switch for the Switching method; None keeps the latest lock.
fn switch_direction(adx: i32, ady: i32, threshold: i32) -> VhDirection {
    if ady > threshold {
        VhDirection::Vertical
    } else if adx > threshold {
        VhDirection::Horizontal
    } else {
        VhDirection::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::{flags, InjectEvent, InputQueue};
    use crate::platform::NullCursorHost;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn harness() -> (Arc<InputQueue>, Resend) {
        let q = Arc::new(InputQueue::new(256));
        (q.clone(), Resend::new(q))
    }

    fn drain(q: &InputQueue) -> Vec<InjectEvent> {
        let batch = q.drain_batch(Duration::from_millis(50));
        q.reclaim(batch.len());
        batch
    }

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.accel_enabled = false;
        s
    }

    struct CursorSpy {
        calls: Mutex<Vec<&'static str>>,
    }

    impl CursorHost for CursorSpy {
        fn change_vertical(&self) {
            self.calls.lock().push("v");
        }
        fn change_horizontal(&self) {
            self.calls.lock().push("h");
        }
        fn restore(&self) {
            self.calls.lock().push("restore");
        }
    }

    #[test]
    fn test_direct_vertical_sign() {
        let (q, resend) = harness();
        let mut session = Session::new(&settings(), (0, 0));
        session.feed((0, 10), (0, 10), &resend, &NullCursorHost);
        let out = drain(&q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, flags::WHEEL);
        // Positive dy scrolls down: negative wheel value.
        assert_eq!(out[0].data, -10);
    }

    #[test]
    fn test_reverse_scroll_flips_vertical() {
        let (q, resend) = harness();
        let mut s = settings();
        s.reverse_scroll = true;
        let mut session = Session::new(&s, (0, 0));
        session.feed((0, 10), (0, 10), &resend, &NullCursorHost);
        assert_eq!(drain(&q)[0].data, 10);
    }

    #[test]
    fn test_horizontal_negates_vertical_convention() {
        let (q, resend) = harness();
        let mut s = settings();
        s.horizontal_threshold = 0;
        let mut session = Session::new(&s, (0, 0));
        session.feed((10, 0), (10, 0), &resend, &NullCursorHost);
        let out = drain(&q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, flags::HWHEEL);
        assert_eq!(out[0].data, 10);
    }

    #[test]
    fn test_threshold_gate_uses_accumulated() {
        let (q, resend) = harness();
        let mut s = settings();
        s.vertical_threshold = 15;
        let mut session = Session::new(&s, (0, 0));
        session.feed((0, 10), (0, 10), &resend, &NullCursorHost);
        assert!(drain(&q).is_empty());
        // Accumulated 20 > 15: the instantaneous delta now emits.
        session.feed((0, 20), (0, 10), &resend, &NullCursorHost);
        assert_eq!(drain(&q).len(), 1);
    }

    #[test]
    fn test_horizontal_disabled_suppresses_h_output() {
        let (q, resend) = harness();
        let mut s = settings();
        s.horizontal_scroll = false;
        s.horizontal_threshold = 0;
        let mut session = Session::new(&s, (0, 0));
        session.feed((30, 0), (30, 0), &resend, &NullCursorHost);
        assert!(drain(&q).is_empty());
    }

    #[test]
    fn test_swap_exchanges_axes() {
        let (q, resend) = harness();
        let mut s = settings();
        s.swap_scroll = true;
        let mut session = Session::new(&s, (0, 0));
        // Horizontal motion becomes vertical output after the swap.
        session.feed((10, 0), (10, 0), &resend, &NullCursorHost);
        let out = drain(&q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, flags::WHEEL);
    }

    #[test]
    fn test_accel_applies_to_direct_output() {
        let (q, resend) = harness();
        let mut s = settings();
        s.accel_enabled = true; // default preset M5
        let mut session = Session::new(&s, (0, 0));
        session.feed((0, 10), (0, 10), &resend, &NullCursorHost);
        // 10 sits on the 2.7 multiplier row: round(10 * 2.7) = 27.
        assert_eq!(drain(&q)[0].data, -27);
    }

    #[test]
    fn test_real_wheel_quick_first_emits_immediately() {
        let (q, resend) = harness();
        let mut s = settings();
        s.real_wheel_mode = true;
        s.quick_first = true;
        let mut session = Session::new(&s, (0, 0));
        session.feed((0, 1), (0, 1), &resend, &NullCursorHost);
        let out = drain(&q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, -120);
    }

    #[test]
    fn test_real_wheel_delayed_first_needs_half_step() {
        let (q, resend) = harness();
        let mut s = settings();
        s.real_wheel_mode = true;
        let mut session = Session::new(&s, (0, 0));
        // Counter starts at 30; 29 more is not enough.
        session.feed((0, 29), (0, 29), &resend, &NullCursorHost);
        assert!(drain(&q).is_empty());
        session.feed((0, 30), (0, 1), &resend, &NullCursorHost);
        assert_eq!(drain(&q).len(), 1);
    }

    #[test]
    fn test_real_wheel_quick_turn_resets_counter() {
        let (q, resend) = harness();
        let mut s = settings();
        s.real_wheel_mode = true;
        s.quick_first = true;
        s.quick_turn = true;
        let mut session = Session::new(&s, (0, 0));
        session.feed((0, 5), (0, 5), &resend, &NullCursorHost);
        assert_eq!(drain(&q)[0].data, -120);
        // Sign reversal emits immediately, opposite direction.
        session.feed((0, 2), (0, -3), &resend, &NullCursorHost);
        let out = drain(&q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, 120);
        // Counter was reset to |d| = 3, so 56 more stays below 60.
        session.feed((0, -54), (0, -56), &resend, &NullCursorHost);
        assert!(drain(&q).is_empty());
        session.feed((0, -55), (0, -1), &resend, &NullCursorHost);
        assert_eq!(drain(&q).len(), 1);
    }

    fn vh_settings() -> Settings {
        let mut s = settings();
        s.vh_adjuster_mode = true;
        s.horizontal_scroll = true;
        s
    }

    #[test]
    fn test_vh_locks_vertical_with_preference() {
        let (q, resend) = harness();
        let cursor = CursorSpy {
            calls: Mutex::new(Vec::new()),
        };
        let mut session = Session::new(&vh_settings(), (0, 0));
        // ady*2 = 12 >= adx = 8: vertical wins under the preference bias.
        session.feed((8, 6), (8, 6), &resend, &cursor);
        let out = drain(&q);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, flags::WHEEL);
        assert_eq!(cursor.calls.lock().as_slice(), ["v"]);
    }

    #[test]
    fn test_vh_below_first_min_emits_nothing() {
        let (q, resend) = harness();
        let mut session = Session::new(&vh_settings(), (0, 0));
        session.feed((3, 4), (3, 4), &resend, &NullCursorHost);
        assert!(drain(&q).is_empty());
    }

    #[test]
    fn test_vh_fixed_keeps_direction() {
        let (q, resend) = harness();
        let mut s = vh_settings();
        s.vh_method = VhMethod::Fixed;
        s.first_prefer_vertical = false;
        let mut session = Session::new(&s, (0, 0));
        session.feed((10, 2), (10, 2), &resend, &NullCursorHost);
        assert_eq!(drain(&q)[0].flags, flags::HWHEEL);
        // Large vertical accumulation cannot steal the lock in Fixed mode.
        session.feed((12, 200), (2, 198), &resend, &NullCursorHost);
        assert_eq!(drain(&q)[0].flags, flags::HWHEEL);
    }

    #[test]
    fn test_vh_switching_changes_direction_and_cursor() {
        let (q, resend) = harness();
        let cursor = CursorSpy {
            calls: Mutex::new(Vec::new()),
        };
        let mut s = vh_settings();
        s.first_prefer_vertical = false;
        let mut session = Session::new(&s, (0, 0));
        session.feed((10, 2), (10, 2), &resend, &cursor);
        assert_eq!(drain(&q)[0].flags, flags::HWHEEL);
        // Vertical accumulation beyond the switching threshold flips the lock.
        session.feed((12, 60), (2, 58), &resend, &cursor);
        assert_eq!(drain(&q)[0].flags, flags::WHEEL);
        assert_eq!(cursor.calls.lock().as_slice(), ["h", "v"]);
    }

    #[test]
    fn test_zero_delta_is_ignored() {
        let (q, resend) = harness();
        let mut session = Session::new(&settings(), (0, 0));
        session.feed((5, 5), (0, 0), &resend, &NullCursorHost);
        assert!(drain(&q).is_empty());
    }
}
