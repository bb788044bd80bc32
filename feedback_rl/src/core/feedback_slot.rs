//! Single-slot mailbox with overwrite-latest semantics.
//!
//! The control plane publishes feedback into the slot; the training loop
//! either takes whatever is pending (non-blocking) or waits a bounded time
//! for the next value. A publish over an unconsumed value replaces it, so the
//! consumer only ever sees the most recent one.
//!
//! ```text
//! Control Thread                          Training Thread
//! ┌──────────────────┐                    ┌──────────────────────┐
//! │ publish(e1)      │                    │                      │
//! │ publish(e2) ─────┼──FeedbackSlot────→ │ take() == Some(e2)   │
//! │                  │   (e1 dropped)     │ take() == None       │
//! └──────────────────┘                    └──────────────────────┘
//! ```

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Bounded, capacity-1 queue where a new value replaces an unconsumed one.
pub struct FeedbackSlot<T> {
    pending: Mutex<Option<T>>,
    available: Condvar,
}

impl<T> FeedbackSlot<T> {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            available: Condvar::new(),
        }
    }

    /// Check if a value is pending without taking it.
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Publish a value, replacing any unconsumed one.
    ///
    /// Returns true if a pending value was overwritten.
    pub fn publish(&self, value: T) -> bool {
        let mut guard = self.pending.lock();
        let was_pending = guard.replace(value).is_some();
        drop(guard);
        self.available.notify_one();
        was_pending
    }

    /// Take the pending value, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.pending.lock().take()
    }

    /// Wait up to `timeout` for a value and take it.
    ///
    /// Returns `None` if nothing arrived in time.
    pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.pending.lock();
        while guard.is_none() {
            if self.available.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        guard.take()
    }

    /// Discard any pending value. Returns true if one was dropped.
    pub fn clear(&self) -> bool {
        self.pending.lock().take().is_some()
    }
}

impl<T> Default for FeedbackSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_publish_and_take() {
        let slot = FeedbackSlot::new();
        assert!(slot.take().is_none());
        assert!(!slot.has_pending());

        slot.publish(0.3_f32);
        assert!(slot.has_pending());
        assert_eq!(slot.take(), Some(0.3));
        assert!(!slot.has_pending());
    }

    #[test]
    fn test_latest_wins() {
        let slot = FeedbackSlot::new();
        assert!(!slot.publish(0.1_f32));
        assert!(slot.publish(0.9_f32));

        assert_eq!(slot.take(), Some(0.9));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_take_timeout_expires() {
        let slot = FeedbackSlot::<f32>::new();
        let start = Instant::now();
        assert!(slot.take_timeout(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_take_timeout_wakes_on_publish() {
        let slot = Arc::new(FeedbackSlot::<f32>::new());
        let producer = Arc::clone(&slot);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.publish(0.5);
        });

        let got = slot.take_timeout(Duration::from_secs(2));
        handle.join().unwrap();
        assert_eq!(got, Some(0.5));
    }

    #[test]
    fn test_clear() {
        let slot = FeedbackSlot::new();
        slot.publish(1_u8);
        assert!(slot.clear());
        assert!(!slot.clear());
        assert!(slot.take().is_none());
    }
}
