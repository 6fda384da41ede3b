//! Failure classification and backoff for upstream calls
//!
//! Upstream failures fall into three groups:
//! - transient (timeouts, connection errors, provider 5xx): retried with
//!   exponential backoff and optional jitter, see [`Backoff`]
//! - quota/rate exhaustion: cooled down and retried by the caller, see
//!   [`Error::is_quota_error`]
//! - everything else: returned immediately
//!
//! # Example
//!
//! ```
//! use channel_scout::config::RetryConfig;
//! use channel_scout::retry::Backoff;
//! use std::time::Duration;
//!
//! let config = RetryConfig {
//!     initial_delay: Duration::from_secs(1),
//!     max_delay: Duration::from_secs(3),
//!     jitter: false,
//!     ..RetryConfig::default()
//! };
//! let mut backoff = Backoff::new(&config);
//!
//! assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
//! assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
//! assert_eq!(backoff.next_delay(), Some(Duration::from_secs(3)));
//! assert_eq!(backoff.next_delay(), None);
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, UpstreamError};
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, provider overload) should return `true`.
/// Permanent failures (bad request, invalid key, malformed response) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Provider-side overload
            Error::Upstream(UpstreamError::Api { status, .. }) => *status >= 500,
            // Quota and rate errors take the cooldown path instead
            Error::Upstream(_) => false,
            Error::Config { .. }
            | Error::Validation(_)
            | Error::NotFound(_)
            | Error::TooManyTasks { .. }
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::ShuttingDown
            | Error::Cancelled => false,
        }
    }
}

impl Error {
    /// Whether the provider reported quota or rate exhaustion
    pub fn is_quota_error(&self) -> bool {
        matches!(
            self,
            Error::Upstream(UpstreamError::QuotaExceeded { .. } | UpstreamError::RateLimited { .. })
        )
    }
}

/// Exponential backoff schedule for one operation
///
/// Yields at most `max_attempts` delays, growing by `backoff_multiplier` and
/// capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: bool,
}

impl Backoff {
    /// Start a fresh schedule
    ///
    /// A multiplier that is not a positive number falls back to a flat delay.
    pub fn new(config: &RetryConfig) -> Self {
        let multiplier = config.backoff_multiplier;
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            delay: config.initial_delay,
            max_delay: config.max_delay,
            multiplier: if multiplier.is_finite() && multiplier > 0.0 {
                multiplier
            } else {
                1.0
            },
            jitter: config.jitter,
        }
    }

    /// Retries consumed so far
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next retry, or `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;

        let current = self.delay.min(self.max_delay);
        self.delay = Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        Some(if self.jitter {
            add_jitter(current)
        } else {
            current
        })
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// result lies between `delay` and `2 * delay`.
pub fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

/// Sleep for `duration` unless `cancel` fires first
///
/// Returns `false` when the sleep was cut short by cancellation.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
