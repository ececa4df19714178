//! Timer scheduling seam for the hover coordinator.
//!
//! The coordinator never sleeps. It asks a [`Scheduler`] to arm a timer,
//! keeps the returned handle, and is told later (via
//! `HoverCoordinator::timer_fired`) that the handle came due. Hosts wire
//! this to their event loop; tests use [`ManualScheduler`] and move time
//! by hand.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Opaque handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Arms and cancels one-shot timers.
pub trait Scheduler {
    /// Arm a one-shot timer due after `delay`.
    fn arm(&mut self, delay: Duration) -> TimerHandle;

    /// Cancel an armed timer. Cancelling a fired or unknown handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug, Default)]
struct ManualInner {
    now: Duration,
    next_id: u64,
    /// handle → deadline
    armed: BTreeMap<TimerHandle, Duration>,
}

/// Deterministic scheduler driven by [`advance`](Self::advance).
///
/// Clones share one clock, so a test can keep a clone while the
/// coordinator owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualInner>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward and return the handles that came due, in
    /// deadline order. Returned handles are no longer armed.
    pub fn advance(&self, by: Duration) -> Vec<TimerHandle> {
        let mut inner = self.inner.lock();
        inner.now += by;
        let now = inner.now;

        let mut due: Vec<(Duration, TimerHandle)> = inner
            .armed
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(handle, deadline)| (*deadline, *handle))
            .collect();
        due.sort();
        for (_, handle) in &due {
            inner.armed.remove(handle);
        }
        due.into_iter().map(|(_, handle)| handle).collect()
    }

    /// Time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }

    /// Number of timers currently armed.
    pub fn armed(&self) -> usize {
        self.inner.lock().armed.len()
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.inner.lock().armed.contains_key(&handle)
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, delay: Duration) -> TimerHandle {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let handle = TimerHandle(inner.next_id);
        let deadline = inner.now + delay;
        inner.armed.insert(handle, deadline);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.inner.lock().armed.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_fires_in_deadline_order() {
        let mut s = ManualScheduler::new();
        let late = s.arm(Duration::from_millis(300));
        let early = s.arm(Duration::from_millis(100));

        assert!(s.advance(Duration::from_millis(50)).is_empty());
        assert_eq!(s.advance(Duration::from_millis(300)), vec![early, late]);
        assert_eq!(s.armed(), 0);
    }

    #[test]
    fn test_cancel_releases_handle() {
        let mut s = ManualScheduler::new();
        let h = s.arm(Duration::from_millis(10));
        s.cancel(h);
        assert!(!s.is_armed(h));
        assert!(s.advance(Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn test_clones_share_clock() {
        let s = ManualScheduler::new();
        let mut owned = s.clone();
        let h = owned.arm(Duration::from_millis(5));
        assert_eq!(s.advance(Duration::from_millis(5)), vec![h]);
        assert_eq!(owned.now(), Duration::from_millis(5));
    }
}
