use core::time::Duration;

use rand::Rng;

/// Default number of read/write passes before giving up on a contended
/// partition.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default bound on a single store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Tuning knobs for an [`Allocator`](crate::Allocator).
///
/// # Example
/// ```
/// use core::time::Duration;
/// use dorsal::{AllocatorConfig, Backoff};
///
/// let config = AllocatorConfig::default()
///     .with_max_attempts(16)
///     .with_store_timeout(Duration::from_millis(500))
///     .with_backoff(Backoff::default().with_max(Duration::from_millis(50)));
///
/// assert_eq!(config.max_attempts(), 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    max_attempts: u32,
    store_timeout: Duration,
    backoff: Backoff,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            backoff: Backoff::default(),
        }
    }
}

impl AllocatorConfig {
    /// Sets the retry budget. Values below `1` are raised to `1`.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub const fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub const fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

/// Capped exponential backoff between conflicting attempts.
///
/// The undithered delay after attempt `n` (1-based) is
/// `min(initial * multiplier^(n-1), max)`. With jitter enabled the actual
/// pause is drawn uniformly from `[delay / 2, delay]` so that callers which
/// collided once do not collide again in lockstep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    multiplier: u32,
    jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(5),
            max: Duration::from_millis(200),
            multiplier: 2,
            jitter: true,
        }
    }
}

impl Backoff {
    /// A backoff that never waits.
    pub const fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            max: Duration::ZERO,
            multiplier: 1,
            jitter: false,
        }
    }

    #[must_use]
    pub const fn with_initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    #[must_use]
    pub const fn with_max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    /// Sets the growth factor. Values below `1` are raised to `1`.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier.max(1);
        self
    }

    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// The ceiling of the pause after the given failed attempt (1-based).
    pub fn ceiling_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// The pause to take after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling_for(attempt);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }
        let floor = ceiling / 2;
        rand::rng().random_range(floor..=ceiling)
    }
}
