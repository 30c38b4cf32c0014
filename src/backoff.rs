use std::time::Duration;

use rand::{rngs::OsRng, Rng};

pub const DEFAULT_BACKOFF_INITIAL: Duration = Duration::from_millis(2);
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_millis(10);
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const DEFAULT_BACKOFF_MAX_JITTER: Duration = Duration::from_millis(2);

/// Exponential backoff policy with a capped base delay and additive jitter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
    /// Base delay before the first retry.
    pub initial: Duration,
    /// Ceiling for the base delay; jitter is added on top.
    pub max: Duration,
    /// Growth factor applied per attempt.
    pub factor: f64,
    /// Upper bound (exclusive) of the random jitter.
    pub max_jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: DEFAULT_BACKOFF_INITIAL,
            max: DEFAULT_BACKOFF_MAX,
            factor: DEFAULT_BACKOFF_FACTOR,
            max_jitter: DEFAULT_BACKOFF_MAX_JITTER,
        }
    }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, factor: f64, max_jitter: Duration) -> Self {
        Self {
            initial,
            max,
            factor,
            max_jitter,
        }
    }

    /// Delay before retrying after `attempt` (zero-based) failed.
    ///
    /// `initial * factor^attempt`, capped at `max`, plus jitter drawn from
    /// `[0, max_jitter)` using the operating system CSPRNG.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt).saturating_add(self.jitter())
    }

    /// Deterministic part of [`Backoff::delay`].
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial.as_nanos() as f64 * self.factor.powi(exponent);

        if scaled.is_nan() || scaled <= 0.0 {
            return Duration::ZERO;
        }
        if scaled >= self.max.as_nanos() as f64 {
            return self.max;
        }
        if scaled < u64::MAX as f64 {
            return Duration::from_nanos(scaled as u64);
        }
        Duration::try_from_secs_f64(scaled / 1e9).unwrap_or(self.max)
    }

    fn jitter(&self) -> Duration {
        let bound = u64::try_from(self.max_jitter.as_nanos()).unwrap_or(u64::MAX);
        if bound == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(OsRng.gen_range(0..bound))
    }
}
