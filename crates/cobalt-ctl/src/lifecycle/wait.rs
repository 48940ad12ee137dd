//! Bounded polling shared by the startup watch and stop confirmation.

use std::thread;
use std::time::{Duration, Instant};

/// Result of a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WaitOutcome<T> {
    Ready(T),
    TimedOut,
}

/// Polls a probe with a growing interval until it yields a value or the
/// overall timeout expires.
///
/// The probe always runs at least once, so a zero timeout still observes the
/// current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundedWait {
    initial_interval: Duration,
    growth_factor: u32,
    max_interval: Duration,
    timeout: Duration,
}

impl BoundedWait {
    /// Polls at a constant interval.
    pub(crate) const fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_interval: interval,
            growth_factor: 1,
            max_interval: interval,
            timeout,
        }
    }

    /// Doubles the interval after each poll up to `max_interval`.
    pub(crate) const fn escalating(
        initial_interval: Duration,
        max_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            initial_interval,
            growth_factor: 2,
            max_interval,
            timeout,
        }
    }

    /// Runs `probe` until it returns `Ok(Some(_))`, an error, or the deadline
    /// passes.
    pub(crate) fn poll<T, E, F>(&self, mut probe: F) -> Result<WaitOutcome<T>, E>
    where
        F: FnMut() -> Result<Option<T>, E>,
    {
        // A timeout too large for the clock never expires.
        let deadline = Instant::now().checked_add(self.timeout);
        let mut interval = self.initial_interval;
        loop {
            if let Some(value) = probe()? {
                return Ok(WaitOutcome::Ready(value));
            }
            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(WaitOutcome::TimedOut);
                    }
                    interval.min(deadline - now)
                }
                None => interval,
            };
            thread::sleep(pause);
            interval = interval
                .saturating_mul(self.growth_factor)
                .min(self.max_interval);
        }
    }
}
