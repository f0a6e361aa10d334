//! Bounded retry with a super-linear backoff curve.
//!
//! The policy only decides *whether* and *how long* to wait; the clock is a
//! [`Sleeper`] so callers can swap the blocking sleep for a recorder in tests.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, warn};

use crate::error::KiraError;

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for Arc<T> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Growth factor applied per further failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Backoff after failed attempt `attempt` (1-based): 2s, 4s, 8s with the
    /// default policy.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.initial_delay.saturating_mul(factor)
    }

    pub fn should_retry(&self, error: &KiraError) -> bool {
        error.is_transport()
    }

    /// Runs `op` until it succeeds, fails with a non-transport error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, KiraError>
    where
        F: FnMut(u32) -> Result<T, KiraError>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !self.should_retry(&err) => return Err(err),
                Err(err) => {
                    if attempt >= max_attempts {
                        error!(attempt, max_attempts, "all attempts failed: {err}");
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "attempt failed: {err}; retrying"
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
