//! Counting Semaphore
//!
//! Small semaphore over a parking_lot mutex/condvar pair. The injection queue
//! uses two of these for items/space backpressure; the hook-side producer only
//! ever calls the non-blocking acquire paths.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

pub struct Semaphore {
    permits: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Semaphore {
            permits: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    /// Take one permit, blocking until available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.cond.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Take one permit without blocking.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_many(1)
    }

    /// Take `n` permits atomically without blocking; all or nothing.
    pub fn try_acquire_many(&self, n: usize) -> bool {
        let mut permits = self.permits.lock();
        if *permits >= n {
            *permits -= n;
            true
        } else {
            false
        }
    }

    /// Take one permit, waiting at most `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut permits = self.permits.lock();
        while *permits == 0 {
            if self.cond.wait_until(&mut permits, deadline).timed_out() {
                return false;
            }
        }
        *permits -= 1;
        true
    }

    /// Return `n` permits.
    pub fn release(&self, n: usize) {
        let mut permits = self.permits.lock();
        *permits += n;
        if n == 1 {
            self.cond.notify_one();
        } else {
            self.cond.notify_all();
        }
    }

    #[cfg(test)]
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_try_acquire_exhausts() {
        let s = Semaphore::new(2);
        assert!(s.try_acquire());
        assert!(s.try_acquire());
        assert!(!s.try_acquire());
        s.release(1);
        assert!(s.try_acquire());
    }

    #[test]
    fn test_try_acquire_many_all_or_nothing() {
        let s = Semaphore::new(3);
        assert!(!s.try_acquire_many(4));
        assert_eq!(s.available(), 3);
        assert!(s.try_acquire_many(3));
        assert_eq!(s.available(), 0);
    }

    #[test]
    fn test_acquire_timeout() {
        let s = Semaphore::new(0);
        assert!(!s.acquire_timeout(Duration::from_millis(20)));

        let s = Arc::new(Semaphore::new(0));
        let s2 = s.clone();
        let h = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            s2.release(1);
        });
        assert!(s.acquire_timeout(Duration::from_secs(5)));
        h.join().unwrap();
    }

    #[test]
    fn test_blocking_acquire_wakes() {
        let s = Arc::new(Semaphore::new(0));
        let s2 = s.clone();
        let h = thread::spawn(move || {
            s2.acquire();
        });
        thread::sleep(Duration::from_millis(10));
        s.release(1);
        h.join().unwrap();
    }
}
