//! Hook Dispatch
//!
//! The thin layer between the OS hook callbacks and the classifiers. Event
//! parameters arrive by value and never touch thread-shared storage, so a
//! synchronous re-entry from our own injected batch cannot corrupt an outer
//! invocation. A panic anywhere inside a checker chain degrades to PASS
//! instead of swallowing the user's input.

use super::keyboard::KeyDispatch;
use super::mouse::MouseDispatch;
use super::Decision;
use crate::config::ConfigStore;
use crate::types::{KeyboardEvent, MouseEvent};
use log::error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Run a classifier chain behind a panic boundary; a crash passes the event
/// through untouched.
pub fn guarded(f: impl FnOnce() -> Decision) -> Decision {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(decision) => decision,
        Err(_) => {
            error!("checker chain panicked, passing event through");
            Decision::Pass
        }
    }
}

/// Entry point the platform hook callbacks deliver into.
pub struct HookDispatch {
    config: Arc<ConfigStore>,
    mouse: Arc<MouseDispatch>,
    keyboard: Arc<KeyDispatch>,
    start: Instant,
    last_event_ms: AtomicU64,
}

impl HookDispatch {
    pub fn new(
        config: Arc<ConfigStore>,
        mouse: Arc<MouseDispatch>,
        keyboard: Arc<KeyDispatch>,
    ) -> Self {
        HookDispatch {
            config,
            mouse,
            keyboard,
            start: Instant::now(),
            last_event_ms: AtomicU64::new(0),
        }
    }

    /// Classify a mouse event from the hook.
    pub fn on_mouse(&self, me: MouseEvent) -> Decision {
        self.tick();
        if self.config.is_pass_mode() {
            return Decision::Pass;
        }
        let mouse = &self.mouse;
        guarded(move || mouse.handle(me))
    }

    /// Classify a keyboard event from the hook.
    pub fn on_key(&self, ke: KeyboardEvent) -> Decision {
        self.tick();
        if self.config.is_pass_mode() || !self.config.keyboard_hook() {
            return Decision::Pass;
        }
        let keyboard = &self.keyboard;
        guarded(move || keyboard.handle(ke))
    }

    pub fn mouse(&self) -> &Arc<MouseDispatch> {
        &self.mouse
    }

    /// Stamp hook liveness; called once per delivered event.
    fn tick(&self) {
        let ms = self.start.elapsed().as_millis() as u64;
        self.last_event_ms.store(ms, Ordering::Release);
    }

    /// Milliseconds since the hook last delivered anything.
    pub fn ms_since_event(&self) -> u64 {
        let now = self.start.elapsed().as_millis() as u64;
        now.saturating_sub(self.last_event_ms.load(Ordering::Acquire))
    }

    /// Whether the hook has gone silent past the configured health interval.
    /// Always false when the watchdog is disabled.
    pub fn hook_stalled(&self) -> bool {
        let interval = self.config.health_check_interval();
        if interval == 0 {
            return false;
        }
        self.ms_since_event() > interval as u64 * 1000
    }
}
