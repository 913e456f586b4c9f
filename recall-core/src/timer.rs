//! Cancellable timers and the engine clock.
//!
//! The engine never sleeps. It asks a [`TimerDriver`] to call back after a
//! delay and is handed the [`TimerId`] again when the delay elapses. At most
//! one timer is armed per engine; arming a new one, resetting, aborting or
//! dropping the engine disarms the previous one, and a callback for a
//! timer that is no longer armed is ignored.
//!
//! [`ManualTimers`] is a virtual-time driver and clock for deterministic
//! tests and for hosts that pump time themselves.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::types::TimerId;

/// Schedules timer callbacks on behalf of an engine.
pub trait TimerDriver: Send {
    /// Deliver `id` back to the engine once `after` has elapsed.
    fn arm(&mut self, id: TimerId, after: Duration);

    /// Cancel `id`. Cancelling an unknown or already-fired id is a no-op.
    fn disarm(&mut self, id: TimerId);

    /// Cancel everything this driver has armed.
    fn disarm_all(&mut self);
}

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock: Send + Sync {
    /// Time since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`std::time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// A clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

// ---------------------------------------------------------------------------
// Virtual time
// ---------------------------------------------------------------------------

/// Virtual-time timer driver and clock. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ManualTimers {
    inner: Arc<Mutex<ManualInner>>,
}

#[derive(Debug, Default)]
struct ManualInner {
    now: Duration,
    pending: BTreeMap<TimerId, Duration>,
}

impl ManualTimers {
    /// Timers starting at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers currently armed.
    #[must_use]
    pub fn armed(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Deadline of the earliest armed timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.inner.lock().pending.values().min().copied()
    }

    /// Move virtual time forward by `by`, handing each timer that comes due
    /// to `fire` in deadline order.
    ///
    /// Timers armed by `fire` itself are honoured if they fall inside the
    /// window. The lock is not held while `fire` runs.
    ///
    /// # Errors
    /// Stops at and returns the first error from `fire`.
    pub fn advance<E>(
        &self,
        by: Duration,
        mut fire: impl FnMut(TimerId) -> Result<(), E>,
    ) -> Result<(), E> {
        let target = self.inner.lock().now + by;
        loop {
            let due = {
                let mut inner = self.inner.lock();
                let next = inner
                    .pending
                    .iter()
                    .filter(|(_, deadline)| **deadline <= target)
                    .min_by_key(|(id, deadline)| (**deadline, **id))
                    .map(|(id, deadline)| (*id, *deadline));
                if let Some((id, deadline)) = next {
                    inner.pending.remove(&id);
                    inner.now = deadline;
                }
                next
            };
            match due {
                Some((id, _)) => fire(id)?,
                None => break,
            }
        }
        self.inner.lock().now = target;
        Ok(())
    }
}

impl TimerDriver for ManualTimers {
    fn arm(&mut self, id: TimerId, after: Duration) {
        let mut inner = self.inner.lock();
        let deadline = inner.now + after;
        inner.pending.insert(id, deadline);
    }

    fn disarm(&mut self, id: TimerId) {
        self.inner.lock().pending.remove(&id);
    }

    fn disarm_all(&mut self) {
        self.inner.lock().pending.clear();
    }
}

impl Clock for ManualTimers {
    fn now(&self) -> Duration {
        self.inner.lock().now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_order() {
        let mut timers = ManualTimers::new();
        timers.arm(TimerId(1), Duration::from_secs(3));
        timers.arm(TimerId(2), Duration::from_secs(1));

        let mut fired = Vec::new();
        timers
            .advance(Duration::from_secs(5), |id| {
                fired.push(id);
                Ok::<(), ()>(())
            })
            .expect("advance");

        assert_eq!(fired, vec![TimerId(2), TimerId(1)]);
        assert_eq!(timers.now(), Duration::from_secs(5));
        assert_eq!(timers.armed(), 0);
    }

    #[test]
    fn disarmed_timers_never_fire() {
        let mut timers = ManualTimers::new();
        timers.arm(TimerId(1), Duration::from_secs(1));
        timers.disarm(TimerId(1));

        let mut fired = 0;
        timers
            .advance(Duration::from_secs(2), |_| {
                fired += 1;
                Ok::<(), ()>(())
            })
            .expect("advance");
        assert_eq!(fired, 0);
    }

    #[test]
    fn timers_armed_while_firing_are_honoured() {
        let timers = ManualTimers::new();
        let mut driver = timers.clone();
        driver.arm(TimerId(1), Duration::from_secs(1));

        let mut fired = Vec::new();
        timers
            .advance(Duration::from_secs(4), |id| {
                fired.push((id, timers.now()));
                if id == TimerId(1) {
                    driver.arm(TimerId(2), Duration::from_secs(2));
                }
                Ok::<(), ()>(())
            })
            .expect("advance");

        assert_eq!(
            fired,
            vec![
                (TimerId(1), Duration::from_secs(1)),
                (TimerId(2), Duration::from_secs(3)),
            ]
        );
    }

    #[test]
    fn timers_beyond_window_stay_armed() {
        let mut timers = ManualTimers::new();
        timers.arm(TimerId(7), Duration::from_secs(10));
        timers
            .advance(Duration::from_secs(9), |_| Ok::<(), ()>(()))
            .expect("advance");
        assert_eq!(timers.armed(), 1);
        assert_eq!(timers.next_deadline(), Some(Duration::from_secs(10)));
    }
}
