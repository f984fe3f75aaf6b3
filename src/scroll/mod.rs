//! Scroll Mode Control
//!
//! Owns the scroll state machine (IDLE -> STARTING -> ACTIVE -> RELEASED) and
//! the raw-motion ingress that drives the wheel engine. State mutations run
//! under one mutex; the hook path reads mode flags through atomics so it
//! never blocks on the ingress thread.

pub mod accel;
pub mod engine;

use crate::config::ConfigStore;
use crate::inject::Resend;
use crate::platform::{CursorHost, MotionSource};
use crate::types::PointerInfo;
use engine::Session;
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Scroll mode phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollMode {
    #[default]
    Idle,
    Starting,
    Active,
    Released,
}

#[derive(Debug, Default)]
struct ScrollState {
    mode: ScrollMode,
    start_time: u32,
    start_point: (i32, i32),
    raw_acc: (i32, i32),
    session: Option<Session>,
}

/// Shared scroll controller.
pub struct ScrollCtl {
    config: Arc<ConfigStore>,
    resend: Arc<Resend>,
    cursor: Arc<dyn CursorHost>,
    motion: Arc<dyn MotionSource>,
    state: Mutex<ScrollState>,
    // Lock-free mirrors of the mode for the hook path.
    in_scroll: AtomicBool,
    released: AtomicBool,
    starting: AtomicBool,
}

impl ScrollCtl {
    pub fn new(
        config: Arc<ConfigStore>,
        resend: Arc<Resend>,
        cursor: Arc<dyn CursorHost>,
        motion: Arc<dyn MotionSource>,
    ) -> Self {
        ScrollCtl {
            config,
            resend,
            cursor,
            motion,
            state: Mutex::new(ScrollState::default()),
            in_scroll: AtomicBool::new(false),
            released: AtomicBool::new(false),
            starting: AtomicBool::new(false),
        }
    }

    /// ACTIVE or RELEASED.
    pub fn is_scroll_mode(&self) -> bool {
        self.in_scroll.load(Ordering::Acquire)
    }

    /// ACTIVE and not yet released.
    pub fn is_pressed(&self) -> bool {
        self.in_scroll.load(Ordering::Acquire) && !self.released.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.in_scroll.load(Ordering::Acquire) && self.released.load(Ordering::Acquire)
    }

    pub fn is_starting(&self) -> bool {
        self.starting.load(Ordering::Acquire)
    }

    /// Current mode snapshot.
    pub fn mode(&self) -> ScrollMode {
        self.state.lock().mode
    }

    /// Mark the pending chord entry so the paired UP gets swallowed.
    pub fn set_starting(&self) {
        let mut st = self.state.lock();
        if st.mode == ScrollMode::Idle {
            st.mode = ScrollMode::Starting;
            self.starting.store(true, Ordering::Release);
        }
    }

    /// The trigger released; scroll survives until locktime-gated exit.
    pub fn set_released(&self) {
        let mut st = self.state.lock();
        if st.mode == ScrollMode::Active {
            st.mode = ScrollMode::Released;
            self.released.store(true, Ordering::Release);
        }
    }

    /// Whether enough time has passed since entry for an UP to exit scroll.
    pub fn locktime_expired(&self, time: u32) -> bool {
        let start = self.state.lock().start_time;
        time.wrapping_sub(start) > self.config.scroll_lock_time()
    }

    /// Enter scroll mode anchored at a mouse event.
    pub fn start_scroll(&self, info: &PointerInfo) {
        let trigger_is_drag = self.config.trigger().is_drag();
        self.enter(info.pt, info.time, trigger_is_drag);
    }

    /// Enter scroll mode from a keyboard trigger; anchors at the current
    /// pointer position.
    pub fn start_scroll_at_cursor(&self, time: u32) {
        let pt = self.cursor.position();
        self.enter(pt, time, false);
    }

    fn enter(&self, pt: (i32, i32), time: u32, trigger_is_drag: bool) {
        let settings = self.config.snapshot();
        let mut st = self.state.lock();
        st.start_time = time;
        st.start_point = pt;
        st.raw_acc = (0, 0);
        st.session = Some(Session::new(&settings, pt));
        st.mode = ScrollMode::Active;

        self.motion.register();
        if settings.cursor_change && !trigger_is_drag && !settings.vh_adjuster_active() {
            self.cursor.change_vertical();
        }

        self.in_scroll.store(true, Ordering::Release);
        self.released.store(false, Ordering::Release);
        self.starting.store(false, Ordering::Release);
        debug!("scroll mode entered at {:?} t={}", pt, time);
    }

    /// Leave scroll mode. Safe to call repeatedly; the second call is a
    /// no-op.
    pub fn exit_scroll(&self) {
        let mut st = self.state.lock();
        if st.mode == ScrollMode::Idle {
            return;
        }
        let was_active = st.session.is_some();
        st.mode = ScrollMode::Idle;
        st.raw_acc = (0, 0);
        st.session = None;

        self.in_scroll.store(false, Ordering::Release);
        self.released.store(false, Ordering::Release);
        self.starting.store(false, Ordering::Release);

        if was_active {
            self.motion.unregister();
            if self.config.cursor_change() {
                self.cursor.restore();
            }
            debug!("scroll mode exited");
        }
    }

    /// Raw pointer delta from the motion source. Accumulates under the state
    /// lock and drives the engine; ignored outside scroll mode.
    pub fn on_raw_delta(&self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        let mut st = self.state.lock();
        if !matches!(st.mode, ScrollMode::Active | ScrollMode::Released) {
            return;
        }
        st.raw_acc.0 += dx;
        st.raw_acc.1 += dy;
        let acc = st.raw_acc;
        if let Some(session) = st.session.as_mut() {
            session.feed(acc, (dx, dy), &self.resend, &*self.cursor);
        }
    }

    /// Accumulated raw motion since entry (test/diagnostic view).
    pub fn raw_acc(&self) -> (i32, i32) {
        self.state.lock().raw_acc
    }

    pub fn start_point(&self) -> (i32, i32) {
        self.state.lock().start_point
    }
}
