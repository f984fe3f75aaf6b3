//! Input Classification
//!
//! Checker-chain classifiers for mouse and keyboard hook events, the trigger
//! waiter and the hook dispatch wrapper. A checker inspects one event and
//! either decides it (pass/suppress) or defers to the next checker in the
//! chain.

pub mod dispatch;
pub mod keyboard;
pub mod mouse;
pub mod waiter;

use crate::types::{KeyEventKind, KeyboardEvent, MouseEvent, MouseEventKind};
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-checker verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Forward to the underlying hook.
    Pass,
    /// Swallow the event.
    Suppress,
    /// No opinion; ask the next checker.
    Continue,
}

/// Chain verdict returned to the hook layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Suppress,
}

/// Latches pairing a DOWN decision with its later UP.
///
/// Each bit is set on the DOWN and consumed (read-and-clear) on the matching
/// UP. The left/right buttons track resent/passed/suppressed independently;
/// the single buttons share one suppressed latch; keyboard suppression is
/// indexed by the low byte of the VK code.
pub struct LastFlags {
    ld_resent: AtomicBool,
    rd_resent: AtomicBool,
    ld_passed: AtomicBool,
    rd_passed: AtomicBool,
    ld_suppressed: AtomicBool,
    rd_suppressed: AtomicBool,
    sd_suppressed: AtomicBool,
    kd_suppressed: [AtomicBool; 256],
}

impl LastFlags {
    pub fn new() -> Self {
        LastFlags {
            ld_resent: AtomicBool::new(false),
            rd_resent: AtomicBool::new(false),
            ld_passed: AtomicBool::new(false),
            rd_passed: AtomicBool::new(false),
            ld_suppressed: AtomicBool::new(false),
            rd_suppressed: AtomicBool::new(false),
            sd_suppressed: AtomicBool::new(false),
            kd_suppressed: std::array::from_fn(|_| AtomicBool::new(false)),
        }
    }

    pub fn set_resent(&self, me: &MouseEvent) {
        match me.kind {
            MouseEventKind::LeftDown => self.ld_resent.store(true, Ordering::Release),
            MouseEventKind::RightDown => self.rd_resent.store(true, Ordering::Release),
            _ => {}
        }
    }

    pub fn get_reset_resent(&self, me: &MouseEvent) -> bool {
        match me.kind {
            MouseEventKind::LeftUp => self.ld_resent.swap(false, Ordering::AcqRel),
            MouseEventKind::RightUp => self.rd_resent.swap(false, Ordering::AcqRel),
            _ => false,
        }
    }

    pub fn set_passed(&self, me: &MouseEvent) {
        match me.kind {
            MouseEventKind::LeftDown => self.ld_passed.store(true, Ordering::Release),
            MouseEventKind::RightDown => self.rd_passed.store(true, Ordering::Release),
            _ => {}
        }
    }

    pub fn get_reset_passed(&self, me: &MouseEvent) -> bool {
        match me.kind {
            MouseEventKind::LeftUp => self.ld_passed.swap(false, Ordering::AcqRel),
            MouseEventKind::RightUp => self.rd_passed.swap(false, Ordering::AcqRel),
            _ => false,
        }
    }

    pub fn set_suppressed(&self, me: &MouseEvent) {
        match me.kind {
            MouseEventKind::LeftDown => self.ld_suppressed.store(true, Ordering::Release),
            MouseEventKind::RightDown => self.rd_suppressed.store(true, Ordering::Release),
            MouseEventKind::MiddleDown | MouseEventKind::X1Down | MouseEventKind::X2Down => {
                self.sd_suppressed.store(true, Ordering::Release)
            }
            _ => {}
        }
    }

    pub fn get_reset_suppressed(&self, me: &MouseEvent) -> bool {
        match me.kind {
            MouseEventKind::LeftUp => self.ld_suppressed.swap(false, Ordering::AcqRel),
            MouseEventKind::RightUp => self.rd_suppressed.swap(false, Ordering::AcqRel),
            MouseEventKind::MiddleUp | MouseEventKind::X1Up | MouseEventKind::X2Up => {
                self.sd_suppressed.swap(false, Ordering::AcqRel)
            }
            _ => false,
        }
    }

    pub fn set_suppressed_key(&self, ke: &KeyboardEvent) {
        if ke.kind == KeyEventKind::KeyDown {
            self.kd_suppressed[(ke.vk & 0xFF) as usize].store(true, Ordering::Release);
        }
    }

    pub fn get_reset_suppressed_key(&self, ke: &KeyboardEvent) -> bool {
        if ke.kind != KeyEventKind::KeyUp {
            return false;
        }
        self.kd_suppressed[(ke.vk & 0xFF) as usize].swap(false, Ordering::AcqRel)
    }

    /// Clear all three latches for the button a DOWN arrived on.
    pub fn reset_lr(&self, me: &MouseEvent) {
        match me.kind {
            MouseEventKind::LeftDown => {
                self.ld_resent.store(false, Ordering::Release);
                self.ld_passed.store(false, Ordering::Release);
                self.ld_suppressed.store(false, Ordering::Release);
            }
            MouseEventKind::RightDown => {
                self.rd_resent.store(false, Ordering::Release);
                self.rd_passed.store(false, Ordering::Release);
                self.rd_suppressed.store(false, Ordering::Release);
            }
            _ => {}
        }
    }

    /// Bulk reset on returning to IDLE.
    pub fn clear(&self) {
        self.ld_resent.store(false, Ordering::Release);
        self.rd_resent.store(false, Ordering::Release);
        self.ld_passed.store(false, Ordering::Release);
        self.rd_passed.store(false, Ordering::Release);
        self.ld_suppressed.store(false, Ordering::Release);
        self.rd_suppressed.store(false, Ordering::Release);
        self.sd_suppressed.store(false, Ordering::Release);
        for b in &self.kd_suppressed {
            b.store(false, Ordering::Release);
        }
    }
}

impl Default for LastFlags {
    fn default() -> Self {
        LastFlags::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointerInfo;

    fn me(kind: MouseEventKind) -> MouseEvent {
        MouseEvent::new(kind, PointerInfo::default())
    }

    #[test]
    fn test_latch_pairs_down_with_up() {
        let f = LastFlags::new();
        f.set_suppressed(&me(MouseEventKind::LeftDown));
        // The right button's latch is untouched.
        assert!(!f.get_reset_suppressed(&me(MouseEventKind::RightUp)));
        assert!(f.get_reset_suppressed(&me(MouseEventKind::LeftUp)));
        // Consuming clears.
        assert!(!f.get_reset_suppressed(&me(MouseEventKind::LeftUp)));
    }

    #[test]
    fn test_single_buttons_share_suppressed_latch() {
        let f = LastFlags::new();
        f.set_suppressed(&me(MouseEventKind::X1Down));
        assert!(f.get_reset_suppressed(&me(MouseEventKind::MiddleUp)));
    }

    #[test]
    fn test_resent_and_passed_are_independent() {
        let f = LastFlags::new();
        f.set_resent(&me(MouseEventKind::RightDown));
        f.set_passed(&me(MouseEventKind::RightDown));
        assert!(f.get_reset_passed(&me(MouseEventKind::RightUp)));
        assert!(f.get_reset_resent(&me(MouseEventKind::RightUp)));
        assert!(!f.get_reset_resent(&me(MouseEventKind::RightUp)));
    }

    #[test]
    fn test_reset_lr_clears_one_side() {
        let f = LastFlags::new();
        f.set_resent(&me(MouseEventKind::LeftDown));
        f.set_suppressed(&me(MouseEventKind::RightDown));
        f.reset_lr(&me(MouseEventKind::LeftDown));
        assert!(!f.get_reset_resent(&me(MouseEventKind::LeftUp)));
        assert!(f.get_reset_suppressed(&me(MouseEventKind::RightUp)));
    }

    #[test]
    fn test_key_latch_indexed_by_low_byte() {
        let f = LastFlags::new();
        let down = KeyboardEvent::new(KeyEventKind::KeyDown, 0x11D, 0);
        let up_aliased = KeyboardEvent::new(KeyEventKind::KeyUp, 0x1D, 0);
        f.set_suppressed_key(&down);
        assert!(f.get_reset_suppressed_key(&up_aliased));
    }

    #[test]
    fn test_clear_resets_everything() {
        let f = LastFlags::new();
        f.set_resent(&me(MouseEventKind::LeftDown));
        f.set_suppressed(&me(MouseEventKind::MiddleDown));
        f.set_suppressed_key(&KeyboardEvent::new(KeyEventKind::KeyDown, 0x09, 0));
        f.clear();
        assert!(!f.get_reset_resent(&me(MouseEventKind::LeftUp)));
        assert!(!f.get_reset_suppressed(&me(MouseEventKind::MiddleUp)));
        assert!(!f.get_reset_suppressed_key(&KeyboardEvent::new(KeyEventKind::KeyUp, 0x09, 0)));
    }
}
