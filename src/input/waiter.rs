//! Trigger Waiter
//!
//! Single-slot rendezvous resolving a withheld trigger DOWN against the next
//! event within a timeout. The hook thread arms the slot and later offers the
//! follow-up event; a dedicated worker either consumes the offer or times out
//! and re-emits the withheld DOWN. The offer side publishes the payload
//! before the WAITING -> OFFERED transition becomes observable, and exactly
//! one of {offer, timeout} wins the slot.

use super::LastFlags;
use crate::config::ConfigStore;
use crate::inject::Resend;
use crate::scroll::ScrollCtl;
use crate::types::{MouseClick, MouseEvent, MouseEventKind};
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const IDLE: u8 = 0;
const WAITING: u8 = 1;
const OFFERED: u8 = 2;
const DONE: u8 = 3;

/// Upper bound on the in-hook wait for the worker's acknowledgement.
const OFFER_ACK_TIMEOUT: Duration = Duration::from_millis(150);

/// Capacity of the queue of pending armed DOWNs.
const ARM_QUEUE_CAPACITY: usize = 4;

struct Slot {
    state: AtomicU8,
    /// Offered payload; written before the state moves to OFFERED.
    payload: Mutex<MouseEvent>,
    /// The armed DOWN; read on the hook thread by `set_flags_offer`.
    armed: Mutex<MouseEvent>,
    lock: Mutex<()>,
    offered_cv: Condvar,
    ack_cv: Condvar,
}

impl Slot {
    fn new() -> Self {
        Slot {
            state: AtomicU8::new(IDLE),
            payload: Mutex::new(MouseEvent::default()),
            armed: Mutex::new(MouseEvent::default()),
            lock: Mutex::new(()),
            offered_cv: Condvar::new(),
            ack_cv: Condvar::new(),
        }
    }
}

/// The waiter: slot plus the worker draining armed DOWNs.
pub struct Waiter {
    slot: Arc<Slot>,
    flags: Arc<LastFlags>,
    scroll: Arc<ScrollCtl>,
    arm_tx: Mutex<Option<SyncSender<MouseEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Waiter {
    pub fn new(
        config: Arc<ConfigStore>,
        flags: Arc<LastFlags>,
        scroll: Arc<ScrollCtl>,
        resend: Arc<Resend>,
    ) -> Self {
        let slot = Arc::new(Slot::new());
        let (tx, rx) = sync_channel::<MouseEvent>(ARM_QUEUE_CAPACITY);

        let worker_slot = slot.clone();
        let worker_flags = flags.clone();
        let worker_scroll = scroll.clone();
        let handle = thread::Builder::new()
            .name("trigger-waiter".to_string())
            .spawn(move || {
                #[cfg(target_os = "windows")]
                crate::platform::windows::boost_current_thread();
                while let Ok(down) = rx.recv() {
                    poll_one(
                        &worker_slot,
                        &down,
                        &config,
                        &worker_flags,
                        &worker_scroll,
                        &resend,
                    );
                }
                debug!("waiter worker stopped");
            })
            .expect("spawn waiter worker");

        Waiter {
            slot,
            flags,
            scroll,
            arm_tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
        }
    }

    /// Arm the slot with a withheld DOWN. Returns false when the pending
    /// queue is full; the caller then lets the event run its normal chain.
    pub fn start(&self, down: &MouseEvent) -> bool {
        *self.slot.armed.lock() = *down;
        self.slot.state.store(WAITING, Ordering::Release);

        let tx = self.arm_tx.lock();
        let Some(tx) = tx.as_ref() else {
            self.slot.state.store(IDLE, Ordering::Release);
            return false;
        };
        match tx.try_send(*down) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                warn!("waiter arm queue full, passing {:?} through", down.kind);
                self.slot.state.store(IDLE, Ordering::Release);
                false
            }
        }
    }

    /// Offer the next event to a waiting slot. Returns true when the slot
    /// accepted it (the caller suppresses the event). Bounded: waits at most
    /// 150 ms for the worker's acknowledgement.
    pub fn offer(&self, me: &MouseEvent) -> bool {
        // Payload must be visible before the OFFERED transition.
        *self.slot.payload.lock() = *me;
        if self
            .slot
            .state
            .compare_exchange(WAITING, OFFERED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        self.set_flags_offer(me);

        let mut guard = self.slot.lock.lock();
        self.slot.offered_cv.notify_all();
        let deadline = Instant::now() + OFFER_ACK_TIMEOUT;
        while self.slot.state.load(Ordering::Acquire) == OFFERED {
            if self
                .slot
                .ack_cv
                .wait_until(&mut guard, deadline)
                .timed_out()
            {
                // The worker is wedged past its bound; the offer still won
                // the slot, so the event stays suppressed.
                warn!("waiter acknowledgement timed out");
                break;
            }
        }
        true
    }

    /// Wake a pending poll without dispatching anything.
    pub fn cancel(&self) {
        self.offer(&MouseEvent::cancel());
    }

    /// Update the latches for the armed DOWN so its later UP is honored.
    /// Runs on the hook thread at offer time.
    fn set_flags_offer(&self, me: &MouseEvent) {
        let armed = *self.slot.armed.lock();
        match me.kind {
            MouseEventKind::Move | MouseEventKind::LeftUp | MouseEventKind::RightUp => {
                self.flags.set_resent(&armed);
            }
            MouseEventKind::LeftDown | MouseEventKind::RightDown => {
                self.flags.set_suppressed(&armed);
                self.flags.set_suppressed(me);
                self.scroll.set_starting();
            }
            _ => {}
        }
    }
}

fn poll_one(
    slot: &Slot,
    down: &MouseEvent,
    config: &ConfigStore,
    flags: &LastFlags,
    scroll: &ScrollCtl,
    resend: &Resend,
) {
    let timeout = Duration::from_millis(config.poll_timeout() as u64);
    let deadline = Instant::now() + timeout;

    let mut offered = {
        let mut guard = slot.lock.lock();
        loop {
            if slot.state.load(Ordering::Acquire) == OFFERED {
                break true;
            }
            if slot.offered_cv.wait_until(&mut guard, deadline).timed_out() {
                break slot.state.load(Ordering::Acquire) == OFFERED;
            }
        }
    };

    if !offered {
        // Timeout transition; loses to a concurrent offer at this CAS.
        offered = slot
            .state
            .compare_exchange(WAITING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_err();
    }

    if !offered {
        from_timeout(down, flags, resend);
        return;
    }

    // Acknowledge receipt, then dispatch outside the hook's bounded wait.
    let result = *slot.payload.lock();
    slot.state.store(DONE, Ordering::Release);
    {
        let _guard = slot.lock.lock();
        slot.ack_cv.notify_all();
    }
    dispatch(down, &result, scroll, resend);
    // A new DOWN may have re-armed the slot already; only DONE resets.
    let _ = slot
        .state
        .compare_exchange(DONE, IDLE, Ordering::AcqRel, Ordering::Acquire);
}

fn dispatch(down: &MouseEvent, result: &MouseEvent, scroll: &ScrollCtl, resend: &Resend) {
    match result.kind {
        // Motion: the user meant a real press-and-drag.
        MouseEventKind::Move => resend.resend_down(down),
        MouseEventKind::LeftUp | MouseEventKind::RightUp => from_up(down, result, resend),
        // The cooperating button: enter scroll mode where it landed.
        MouseEventKind::LeftDown | MouseEventKind::RightDown => {
            scroll.start_scroll(&result.info);
        }
        MouseEventKind::Cancel => {}
        _ => {}
    }
}

fn from_up(down: &MouseEvent, up: &MouseEvent, resend: &Resend) {
    if down.info.pt == up.info.pt {
        match down.kind {
            MouseEventKind::LeftDown => resend.resend_click(MouseClick::Left, &down.info),
            MouseEventKind::RightDown => resend.resend_click(MouseClick::Right, &down.info),
            _ => {
                resend.resend_down(down);
                resend.resend_up(up);
            }
        }
    } else {
        resend.resend_down(down);
        resend.resend_up(up);
    }
}

fn from_timeout(down: &MouseEvent, flags: &LastFlags, resend: &Resend) {
    flags.set_resent(down);
    resend.resend_down(down);
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.arm_tx.lock().take();
        // Unblock a pending poll so the worker can observe the closed queue.
        self.cancel();
        if let Some(h) = self.worker.lock().take() {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::inject::{flags as evflags, InjectEvent, InputQueue};
    use crate::platform::{NullCursorHost, NullMotionSource};
    use crate::types::PointerInfo;

    struct Harness {
        waiter: Waiter,
        queue: Arc<InputQueue>,
        flags: Arc<LastFlags>,
        scroll: Arc<ScrollCtl>,
    }

    fn harness(poll_timeout: u32) -> Harness {
        let mut settings = Settings::default();
        settings.poll_timeout = poll_timeout;
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
        let waiter = Waiter::new(config, flags.clone(), scroll.clone(), resend);
        Harness {
            waiter,
            queue,
            flags,
            scroll,
        }
    }

    fn drain(queue: &InputQueue, wait: Duration) -> Vec<InjectEvent> {
        let batch = queue.drain_batch(wait);
        queue.reclaim(batch.len());
        batch
    }

    fn left_down(x: i32, y: i32) -> MouseEvent {
        MouseEvent::new(MouseEventKind::LeftDown, PointerInfo::at(x, y, 0))
    }

    #[test]
    fn test_offer_before_timeout_enters_scroll() {
        let h = harness(200);
        assert!(h.waiter.start(&left_down(0, 0)));
        thread::sleep(Duration::from_millis(20));
        let second = MouseEvent::new(MouseEventKind::RightDown, PointerInfo::at(0, 0, 100));
        assert!(h.waiter.offer(&second));
        // Worker dispatches right after acknowledging.
        let deadline = Instant::now() + Duration::from_secs(2);
        while !h.scroll.is_scroll_mode() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(h.scroll.is_scroll_mode());
        // Both downs are latched suppressed so their UPs get swallowed.
        assert!(h.flags.get_reset_suppressed(&MouseEvent::new(
            MouseEventKind::LeftUp,
            PointerInfo::default()
        )));
        assert!(h.flags.get_reset_suppressed(&MouseEvent::new(
            MouseEventKind::RightUp,
            PointerInfo::default()
        )));
    }

    #[test]
    fn test_timeout_resends_down() {
        let h = harness(50);
        let down = left_down(5, 5);
        assert!(h.waiter.start(&down));
        // Nothing offered; the poll must expire and re-emit the DOWN.
        let out = drain(&h.queue, Duration::from_millis(500));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, evflags::LEFT_DOWN);
        assert_eq!(out[0].extra, crate::inject::RESEND_TAG);
        assert_eq!(out[0].pt, (5, 5));
        assert!(h.flags.get_reset_resent(&MouseEvent::new(
            MouseEventKind::LeftUp,
            PointerInfo::default()
        )));
    }

    #[test]
    fn test_offer_after_timeout_is_rejected() {
        let h = harness(50);
        assert!(h.waiter.start(&left_down(0, 0)));
        // Wait past the poll window so the timeout transition wins.
        assert!(!drain(&h.queue, Duration::from_millis(500)).is_empty());
        let mv = MouseEvent::new(MouseEventKind::Move, PointerInfo::at(1, 1, 60));
        assert!(!h.waiter.offer(&mv));
    }

    #[test]
    fn test_move_offer_resends_down_as_drag_start() {
        let h = harness(300);
        let down = left_down(2, 3);
        assert!(h.waiter.start(&down));
        thread::sleep(Duration::from_millis(10));
        let mv = MouseEvent::new(MouseEventKind::Move, PointerInfo::at(9, 9, 20));
        assert!(h.waiter.offer(&mv));
        let out = drain(&h.queue, Duration::from_millis(500));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].flags, evflags::LEFT_DOWN);
        // The armed DOWN is marked resent so its UP passes through later.
        assert!(h.flags.get_reset_resent(&MouseEvent::new(
            MouseEventKind::LeftUp,
            PointerInfo::default()
        )));
    }

    #[test]
    fn test_up_at_same_point_becomes_click() {
        let h = harness(300);
        assert!(h.waiter.start(&left_down(7, 7)));
        thread::sleep(Duration::from_millis(10));
        let up = MouseEvent::new(MouseEventKind::LeftUp, PointerInfo::at(7, 7, 30));
        assert!(h.waiter.offer(&up));
        let out = drain(&h.queue, Duration::from_millis(500));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].flags, evflags::LEFT_DOWN);
        assert_eq!(out[1].flags, evflags::LEFT_UP);
        assert!(out.iter().all(|e| e.extra == crate::inject::RESEND_CLICK_TAG));
    }

    #[test]
    fn test_up_at_different_point_resends_both() {
        let h = harness(300);
        assert!(h.waiter.start(&left_down(0, 0)));
        thread::sleep(Duration::from_millis(10));
        let up = MouseEvent::new(MouseEventKind::LeftUp, PointerInfo::at(10, 0, 30));
        assert!(h.waiter.offer(&up));
        let out = drain(&h.queue, Duration::from_millis(500));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].flags, evflags::LEFT_DOWN);
        assert_eq!(out[1].flags, evflags::LEFT_UP);
        assert!(out.iter().all(|e| e.extra == crate::inject::RESEND_TAG));
    }

    #[test]
    fn test_resolves_exactly_once() {
        // Offered path must not also produce the timeout resend.
        let h = harness(80);
        assert!(h.waiter.start(&left_down(0, 0)));
        thread::sleep(Duration::from_millis(10));
        let down2 = MouseEvent::new(MouseEventKind::RightDown, PointerInfo::at(0, 0, 10));
        assert!(h.waiter.offer(&down2));
        // Past the poll window: no resend may appear.
        thread::sleep(Duration::from_millis(200));
        assert!(drain(&h.queue, Duration::from_millis(20)).is_empty());
    }

    #[test]
    fn test_offer_without_arm_is_rejected() {
        let h = harness(100);
        let mv = MouseEvent::new(MouseEventKind::Move, PointerInfo::at(1, 1, 0));
        assert!(!h.waiter.offer(&mv));
    }

    #[test]
    fn test_cancel_discards_pending_wait() {
        let h = harness(400);
        assert!(h.waiter.start(&left_down(0, 0)));
        thread::sleep(Duration::from_millis(10));
        h.waiter.cancel();
        // Neither a resend nor a scroll entry may result.
        thread::sleep(Duration::from_millis(100));
        assert!(drain(&h.queue, Duration::from_millis(20)).is_empty());
        assert!(!h.scroll.is_scroll_mode());
    }
}
