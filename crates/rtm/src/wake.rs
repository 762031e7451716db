// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wake notification with an atomic fast path.
//!
//! Used by the NEW publisher (data arrived) and by every worker thread as
//! its stop signal, so `release()` / `stop()` never wait out a full sleep.
//!
//! # Architecture
//! - Atomic flag for the lock-free producer side
//! - Condvar fallback while the worker is parked
//!
//! Signals coalesce: any number of `notify()` calls made before the worker
//! wakes are observed as a single wake-up.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Coalescing wake notifier.
///
/// # Example
/// ```
/// use rtm::wake::WakeNotifier;
/// use std::time::Duration;
///
/// let notifier = WakeNotifier::new();
/// notifier.notify();
/// notifier.notify(); // coalesced with the first
///
/// assert!(notifier.wait_timeout(Duration::from_millis(1)));
/// assert!(!notifier.wait_timeout(Duration::from_millis(1)));
/// ```
#[derive(Debug, Default)]
pub struct WakeNotifier {
    /// Set by producers, cleared by the waiting side
    pending: AtomicBool,
    /// True while the consumer is parked on the condvar
    sleeping: Mutex<bool>,
    condvar: Condvar,
}

impl WakeNotifier {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake the consumer if it is parked.
    #[inline]
    pub fn notify(&self) {
        self.pending.store(true, Ordering::Release);

        // Racy read is fine: worst case is one spurious signal
        if *self.sleeping.lock() {
            self.condvar.notify_all();
        }
    }

    /// Consume a pending notification without blocking.
    #[inline]
    pub fn check_and_clear(&self) -> bool {
        self.pending.swap(false, Ordering::Acquire)
    }

    /// Peek without consuming.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Block until notified or until `timeout` elapses.
    ///
    /// Returns `true` if a notification was consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout)
    }

    /// Block until notified or until `deadline`.
    ///
    /// Returns `true` if a notification was consumed.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        if self.pending.swap(false, Ordering::Acquire) {
            return true;
        }

        let mut sleeping = self.sleeping.lock();
        loop {
            // Double-check under the lock so a notify() racing with us is not lost
            if self.pending.swap(false, Ordering::Acquire) {
                *sleeping = false;
                return true;
            }
            *sleeping = true;
            let timed_out = self.condvar.wait_until(&mut sleeping, deadline).timed_out();
            *sleeping = false;
            if timed_out {
                return self.pending.swap(false, Ordering::Acquire);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_notify_before_wait() {
        let n = WakeNotifier::new();
        n.notify();
        assert!(n.is_pending());
        assert!(n.wait_timeout(Duration::from_millis(10)));
        assert!(!n.is_pending());
    }

    #[test]
    fn test_timeout_without_notify() {
        let n = WakeNotifier::new();
        let start = Instant::now();
        assert!(!n.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cross_thread_wake() {
        let n = Arc::new(WakeNotifier::new());
        let n2 = Arc::clone(&n);
        let waiter = thread::spawn(move || n2.wait_timeout(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        n.notify();
        assert!(waiter.join().expect("waiter panicked"));
    }

    #[test]
    fn test_signals_coalesce() {
        let n = WakeNotifier::new();
        for _ in 0..10 {
            n.notify();
        }
        assert!(n.check_and_clear());
        assert!(!n.check_and_clear());
    }
}
