//! Keyboard Classifier
//!
//! Same checker-chain shape as the mouse side, over key down/up. A single
//! configured virtual key arms scroll mode on its DOWN and exits it on UP,
//! honoring the scroll lock time. Suppressed DOWNs latch per VK low byte so
//! the paired UP is swallowed too.

use super::{Check, Decision, LastFlags};
use crate::config::{ConfigStore, ModeObserver};
use crate::scroll::ScrollCtl;
use crate::types::{KeyEventKind, KeyboardEvent, Trigger};
use parking_lot::Mutex;
use std::sync::Arc;

type KChecker = fn(&KeyDispatch, &KeyboardEvent) -> Check;

/// The keyboard event classifier.
pub struct KeyDispatch {
    config: Arc<ConfigStore>,
    flags: Arc<LastFlags>,
    scroll: Arc<ScrollCtl>,
    last_event: Mutex<(KeyEventKind, u16)>,
}

impl KeyDispatch {
    pub fn new(config: Arc<ConfigStore>, flags: Arc<LastFlags>, scroll: Arc<ScrollCtl>) -> Self {
        KeyDispatch {
            config,
            flags,
            scroll,
            last_event: Mutex::new((KeyEventKind::NonEvent, 0)),
        }
    }

    /// Classify one key event.
    pub fn handle(&self, ke: KeyboardEvent) -> Decision {
        let chain = match (self.is_trigger_key(&ke), ke.kind) {
            (true, KeyEventKind::KeyDown) => TRIGGER_DOWN,
            (true, KeyEventKind::KeyUp) => TRIGGER_UP,
            (false, KeyEventKind::KeyDown) => OTHER_DOWN,
            (false, KeyEventKind::KeyUp) => OTHER_UP,
            _ => return Decision::Pass,
        };
        self.run(chain, &ke)
    }

    fn run(&self, chain: &[KChecker], ke: &KeyboardEvent) -> Decision {
        for checker in chain {
            match checker(self, ke) {
                Check::Pass => return Decision::Pass,
                Check::Suppress => return Decision::Suppress,
                Check::Continue => {}
            }
        }
        Decision::Pass
    }

    fn is_trigger_key(&self, ke: &KeyboardEvent) -> bool {
        let vk = self.config.vk_code();
        vk != 0 && ke.vk == vk
    }

    // ---- checkers ----

    fn skip_first_up(&self, _ke: &KeyboardEvent) -> Check {
        if self.last_event.lock().0 == KeyEventKind::NonEvent {
            return Check::Pass;
        }
        Check::Continue
    }

    // Key repeat floods identical DOWNs while held; swallow them in scroll
    // mode so the trigger key does not leak through.
    fn check_same_last(&self, ke: &KeyboardEvent) -> Check {
        let mut last = self.last_event.lock();
        if (ke.kind, ke.vk) == *last && self.scroll.is_scroll_mode() {
            return Check::Suppress;
        }
        *last = (ke.kind, ke.vk);
        Check::Continue
    }

    fn check_trigger_scroll_start(&self, ke: &KeyboardEvent) -> Check {
        if self.is_trigger_key(ke) {
            self.scroll.start_scroll_at_cursor(ke.time);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_exit_scroll_down(&self, ke: &KeyboardEvent) -> Check {
        if self.scroll.is_released() {
            self.scroll.exit_scroll();
            self.flags.set_suppressed_key(ke);
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_exit_scroll_up(&self, ke: &KeyboardEvent) -> Check {
        if self.scroll.is_pressed() {
            if self.scroll.locktime_expired(ke.time) {
                self.scroll.exit_scroll();
            } else {
                self.scroll.set_released();
            }
            return Check::Suppress;
        }
        Check::Continue
    }

    fn check_suppressed_down(&self, ke: &KeyboardEvent) -> Check {
        if self.flags.get_reset_suppressed_key(ke) {
            return Check::Suppress;
        }
        Check::Continue
    }

    fn end_illegal(&self, _ke: &KeyboardEvent) -> Check {
        Check::Suppress
    }
}

impl ModeObserver for KeyDispatch {
    fn trigger_changed(&self, _new: Trigger) {
        *self.last_event.lock() = (KeyEventKind::NonEvent, 0);
    }

    fn state_reset(&self) {
        *self.last_event.lock() = (KeyEventKind::NonEvent, 0);
    }
}

const TRIGGER_DOWN: &[KChecker] = &[
    KeyDispatch::check_same_last,
    KeyDispatch::check_exit_scroll_down,
    KeyDispatch::check_trigger_scroll_start,
    KeyDispatch::end_illegal,
];

const TRIGGER_UP: &[KChecker] = &[
    KeyDispatch::skip_first_up,
    KeyDispatch::check_same_last,
    KeyDispatch::check_suppressed_down,
    KeyDispatch::check_exit_scroll_up,
    KeyDispatch::end_illegal,
];

const OTHER_DOWN: &[KChecker] = &[KeyDispatch::check_exit_scroll_down];

const OTHER_UP: &[KChecker] = &[KeyDispatch::check_suppressed_down];
