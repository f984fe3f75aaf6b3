//! Input Injection Queue
//!
//! Bounded ring feeding a dedicated injector thread. Producers run on the
//! hook thread and must never block: space is taken with a non-blocking
//! acquire and the event is dropped when the queue is full. The worker drains
//! opportunistically and hands the whole batch to the OS in one call, so
//! injected order always equals enqueue order.

mod sem;

use crate::platform::Injector;
use crate::types::{MouseClick, MouseEvent, MouseEventKind, PointerInfo};
use log::{debug, error, info};
use parking_lot::Mutex;
use sem::Semaphore;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Tag marking events this process re-emitted after withholding them.
pub const RESEND_TAG: u32 = 0x5731_3057;

/// Tag marking synthetic through-clicks.
pub const RESEND_CLICK_TAG: u32 = 0x5731_4357;

/// Event flag words of the injection wire format.
pub mod flags {
    pub const LEFT_DOWN: u32 = 0x0002;
    pub const LEFT_UP: u32 = 0x0004;
    pub const RIGHT_DOWN: u32 = 0x0008;
    pub const RIGHT_UP: u32 = 0x0010;
    pub const MIDDLE_DOWN: u32 = 0x0020;
    pub const MIDDLE_UP: u32 = 0x0040;
    pub const X_DOWN: u32 = 0x0080;
    pub const X_UP: u32 = 0x0100;
    pub const WHEEL: u32 = 0x0800;
    pub const HWHEEL: u32 = 0x1000;
    pub const XBUTTON1: u32 = 0x0001;
    pub const XBUTTON2: u32 = 0x0002;
}

/// One synthesized event in injection wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectEvent {
    pub pt: (i32, i32),
    /// Wheel delta or X button selector, per `flags`.
    pub data: i32,
    pub flags: u32,
    pub time: u32,
    pub extra: u32,
}

impl InjectEvent {
    fn new(pt: (i32, i32), data: i32, flags: u32, extra: u32) -> Self {
        InjectEvent {
            pt,
            data,
            flags,
            time: 0,
            extra,
        }
    }
}

/// Default ring capacity.
pub const QUEUE_CAPACITY: usize = 256;

/// Bounded SPSC-style queue between the hook thread and the injector worker.
pub struct InputQueue {
    ring: Mutex<VecDeque<InjectEvent>>,
    items: Semaphore,
    space: Semaphore,
    capacity: usize,
    dropped: AtomicU64,
}

impl InputQueue {
    pub fn new(capacity: usize) -> Self {
        InputQueue {
            ring: Mutex::new(VecDeque::with_capacity(capacity)),
            items: Semaphore::new(0),
            space: Semaphore::new(capacity),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue one event. Never blocks; returns false and drops the event
    /// when the ring is full.
    pub fn enqueue(&self, ev: InjectEvent) -> bool {
        if !self.space.try_acquire() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.ring.lock().push_back(ev);
        self.items.release(1);
        true
    }

    /// Enqueue a down/up pair; succeeds or fails as a unit.
    pub fn enqueue_pair(&self, down: InjectEvent, up: InjectEvent) -> bool {
        if !self.space.try_acquire_many(2) {
            self.dropped.fetch_add(2, Ordering::Relaxed);
            return false;
        }
        {
            let mut ring = self.ring.lock();
            ring.push_back(down);
            ring.push_back(up);
        }
        self.items.release(2);
        true
    }

    /// Wait up to `timeout` for an item, then take as much of the backlog as
    /// is immediately available. Space is not returned until the caller calls
    /// [`InputQueue::reclaim`], keeping backpressure honest while the batch is
    /// in flight.
    pub fn drain_batch(&self, timeout: Duration) -> Vec<InjectEvent> {
        if !self.items.acquire_timeout(timeout) {
            return Vec::new();
        }
        let mut n = 1;
        while n < self.capacity && self.items.try_acquire() {
            n += 1;
        }
        let mut ring = self.ring.lock();
        ring.drain(..n).collect()
    }

    /// Return space for a delivered batch.
    pub fn reclaim(&self, n: usize) {
        self.space.release(n);
    }

    /// Events dropped on the producer side since startup.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }
}

/// Handle for the injector worker thread.
pub struct InjectorWorker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InjectorWorker {
    /// Spawn the worker draining `queue` into `injector`.
    pub fn spawn(queue: Arc<InputQueue>, injector: Arc<dyn Injector>) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = shutdown.clone();
        let handle = thread::Builder::new()
            .name("inject-worker".to_string())
            .spawn(move || {
                #[cfg(target_os = "windows")]
                crate::platform::windows::boost_current_thread();
                info!("injector worker started");
                while !stop.load(Ordering::Acquire) {
                    let batch = queue.drain_batch(Duration::from_millis(100));
                    if batch.is_empty() {
                        continue;
                    }
                    if let Err(e) = injector.inject_batch(&batch) {
                        // Keep draining; a failed send must not wedge the ring.
                        error!("batch inject failed: {}", e);
                    }
                    queue.reclaim(batch.len());
                }
                debug!("injector worker stopped");
            })
            .expect("spawn injector worker");
        InjectorWorker {
            shutdown,
            handle: Some(handle),
        }
    }
}

impl Drop for InjectorWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Producer-side helpers that put tagged synthetic events on the queue.
pub struct Resend {
    queue: Arc<InputQueue>,
}

impl Resend {
    pub fn new(queue: Arc<InputQueue>) -> Self {
        Resend { queue }
    }

    pub fn queue(&self) -> &Arc<InputQueue> {
        &self.queue
    }

    /// Re-emit a withheld DOWN, tagged so the classifier recognizes it.
    pub fn resend_down(&self, me: &MouseEvent) {
        let flag = match me.kind {
            MouseEventKind::LeftDown => flags::LEFT_DOWN,
            MouseEventKind::RightDown => flags::RIGHT_DOWN,
            _ => return,
        };
        self.queue
            .enqueue(InjectEvent::new(me.info.pt, 0, flag, RESEND_TAG));
    }

    /// Re-emit a withheld UP.
    pub fn resend_up(&self, me: &MouseEvent) {
        let flag = match me.kind {
            MouseEventKind::LeftUp => flags::LEFT_UP,
            MouseEventKind::RightUp => flags::RIGHT_UP,
            _ => return,
        };
        self.queue
            .enqueue(InjectEvent::new(me.info.pt, 0, flag, RESEND_TAG));
    }

    /// Emit a full synthetic click at the event's coordinates.
    pub fn resend_click(&self, click: MouseClick, info: &PointerInfo) {
        let (down_flag, up_flag, data) = match click {
            MouseClick::Left => (flags::LEFT_DOWN, flags::LEFT_UP, 0),
            MouseClick::Right => (flags::RIGHT_DOWN, flags::RIGHT_UP, 0),
            MouseClick::Middle => (flags::MIDDLE_DOWN, flags::MIDDLE_UP, 0),
            MouseClick::X1 => (flags::X_DOWN, flags::X_UP, flags::XBUTTON1 as i32),
            MouseClick::X2 => (flags::X_DOWN, flags::X_UP, flags::XBUTTON2 as i32),
        };
        let down = InjectEvent::new(info.pt, data, down_flag, RESEND_CLICK_TAG);
        let up = InjectEvent::new(info.pt, data, up_flag, RESEND_CLICK_TAG);
        self.queue.enqueue_pair(down, up);
    }

    /// Emit a wheel event at the scroll start point.
    pub fn send_wheel(&self, pt: (i32, i32), delta: i32, horizontal: bool) {
        let flag = if horizontal {
            flags::HWHEEL
        } else {
            flags::WHEEL
        };
        self.queue.enqueue(InjectEvent::new(pt, delta, flag, 0));
    }
}

/// Whether an injected event carries the resend tag.
pub fn is_resend(me: &MouseEvent) -> bool {
    me.info.extra == RESEND_TAG
}

/// Whether an injected event carries the through-click tag.
pub fn is_resend_click(me: &MouseEvent) -> bool {
    me.info.extra == RESEND_CLICK_TAG
}
