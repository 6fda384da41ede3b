//! Process-wide request governor for the upstream API
//!
//! The RateGovernor is shared by every running task. It keeps two rolling
//! windows (minute and day), each with a request counter and a reset deadline,
//! plus a consecutive-failure counter that drives exponential spacing between
//! requests.
//!
//! # Algorithm
//!
//! - Expired windows reset first (counter to zero, deadline to now + length)
//! - An exhausted window blocks admission until its deadline
//! - Otherwise the next request is spaced by
//!   `base_delay * 2^min(consecutive_errors, max_backoff_exponent)`, minus the
//!   time already elapsed since the previous request
//!
//! Check and record are separate steps, so concurrent tasks may overshoot a
//! budget by the number of tasks suspended between the two. That slack is
//! accepted; the provider's own quota errors are the hard limit.

use crate::config::RateLimitConfig;
use crate::retry::sleep_or_cancel;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of an admission check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admission {
    /// Whether a budget still has room
    pub allowed: bool,
    /// How long to wait: until the window reset when not allowed, or the
    /// smoothing delay when allowed
    pub delay: Duration,
}

/// Governor usage snapshot
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GovernorStats {
    /// Requests recorded in the current minute window
    pub requests_this_minute: u32,
    /// Minute budget
    pub requests_per_minute: u32,
    /// Requests recorded in the current day window
    pub requests_today: u32,
    /// Day budget
    pub requests_per_day: u32,
    /// Seconds until the minute window resets
    pub minute_resets_in_secs: u64,
    /// Seconds until the day window resets
    pub day_resets_in_secs: u64,
    /// Failures since the last success
    pub consecutive_errors: u32,
    /// Daily usage as a fraction of the budget (0.0 - 1.0+)
    pub daily_usage_ratio: f64,
}

#[derive(Debug)]
struct Window {
    count: u32,
    budget: u32,
    length: Duration,
    resets_at: Instant,
}

impl Window {
    fn new(budget: u32, length: Duration, now: Instant) -> Self {
        Self {
            count: 0,
            budget,
            length,
            resets_at: now + length,
        }
    }

    fn roll(&mut self, now: Instant) {
        if now >= self.resets_at {
            self.count = 0;
            self.resets_at = now + self.length;
        }
    }

    fn exhausted(&self) -> bool {
        self.count >= self.budget
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.resets_at.saturating_duration_since(now)
    }
}

#[derive(Debug)]
struct GovernorState {
    minute: Window,
    day: Window,
    consecutive_errors: u32,
    last_request: Option<Instant>,
}

/// Shared request governor
///
/// Cheap to clone; all clones share the same counters.
#[derive(Clone, Debug)]
pub struct RateGovernor {
    config: Arc<RateLimitConfig>,
    state: Arc<Mutex<GovernorState>>,
}

impl RateGovernor {
    /// Create a governor with fresh windows starting now
    pub fn new(config: RateLimitConfig) -> Self {
        let now = Instant::now();
        let state = GovernorState {
            minute: Window::new(config.requests_per_minute, MINUTE, now),
            day: Window::new(config.requests_per_day, DAY, now),
            consecutive_errors: 0,
            last_request: None,
        };

        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Check both budgets and compute the required delay
    pub async fn check_and_delay(&self) -> Admission {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        state.minute.roll(now);
        state.day.roll(now);

        let blocked = [&state.minute, &state.day]
            .into_iter()
            .filter(|w| w.exhausted())
            .map(|w| w.remaining(now))
            .min();

        if let Some(delay) = blocked {
            return Admission {
                allowed: false,
                // a window that just rolled can report zero; never spin
                delay: delay.max(Duration::from_millis(1)),
            };
        }

        let exponent = state.consecutive_errors.min(self.config.max_backoff_exponent);
        let spacing = self.config.base_delay.saturating_mul(1u32 << exponent.min(31));
        let elapsed = state
            .last_request
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(spacing);

        Admission {
            allowed: true,
            delay: spacing.saturating_sub(elapsed),
        }
    }

    /// Record the outcome of an upstream request
    pub async fn record_request(&self, success: bool) {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        state.minute.roll(now);
        state.day.roll(now);
        state.minute.count = state.minute.count.saturating_add(1);
        state.day.count = state.day.count.saturating_add(1);
        state.last_request = Some(now);

        if success {
            state.consecutive_errors = 0;
        } else {
            state.consecutive_errors = state.consecutive_errors.saturating_add(1);
        }
    }

    /// Block until a request may be issued
    ///
    /// Sleeps for whatever [`check_and_delay`](Self::check_and_delay) asks,
    /// re-checking after every window wait. Returns `false` if `cancel` fired
    /// while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        loop {
            let admission = self.check_and_delay().await;

            if !admission.allowed {
                tracing::debug!(
                    delay_ms = admission.delay.as_millis() as u64,
                    "request budget exhausted, waiting for window reset"
                );
                if !sleep_or_cancel(admission.delay, cancel).await {
                    return false;
                }
                continue;
            }

            return sleep_or_cancel(admission.delay, cancel).await;
        }
    }

    /// Current usage snapshot
    pub async fn stats(&self) -> GovernorStats {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.minute.roll(now);
        state.day.roll(now);

        GovernorStats {
            requests_this_minute: state.minute.count,
            requests_per_minute: state.minute.budget,
            requests_today: state.day.count,
            requests_per_day: state.day.budget,
            minute_resets_in_secs: state.minute.remaining(now).as_secs(),
            day_resets_in_secs: state.day.remaining(now).as_secs(),
            consecutive_errors: state.consecutive_errors,
            daily_usage_ratio: f64::from(state.day.count) / f64::from(state.day.budget.max(1)),
        }
    }

    /// Warning text once daily usage crosses the configured ratio
    pub async fn quota_warning(&self) -> Option<String> {
        let stats = self.stats().await;
        if stats.daily_usage_ratio < self.config.quota_warning_ratio {
            return None;
        }

        Some(format!(
            "daily request budget {:.0}% used ({} of {})",
            stats.daily_usage_ratio * 100.0,
            stats.requests_today,
            stats.requests_per_day
        ))
    }

    /// Extra pause after the provider reports quota or rate exhaustion
    pub fn quota_cooldown(&self) -> Duration {
        self.config.quota_cooldown
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn governor(rpm: u32, rpd: u32) -> RateGovernor {
        RateGovernor::new(RateLimitConfig {
            requests_per_minute: rpm,
            requests_per_day: rpd,
            base_delay: Duration::from_millis(200),
            max_backoff_exponent: 3,
            ..RateLimitConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_is_admitted_immediately() {
        let governor = governor(10, 100);
        let admission = governor.check_and_delay().await;
        assert!(admission.allowed);
        assert_eq!(admission.delay, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn minute_budget_blocks_until_window_reset() {
        let governor = governor(5, 1000);

        for _ in 0..5 {
            governor.record_request(true).await;
        }

        let blocked = governor.check_and_delay().await;
        assert!(!blocked.allowed);
        assert!(blocked.delay > Duration::ZERO);
        assert!(blocked.delay <= MINUTE);

        tokio::time::advance(MINUTE).await;

        let admitted = governor.check_and_delay().await;
        assert!(admitted.allowed);
        assert_eq!(governor.stats().await.requests_this_minute, 0);
        assert_eq!(governor.stats().await.requests_today, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn day_budget_outlives_minute_reset() {
        let governor = governor(100, 3);

        for _ in 0..3 {
            governor.record_request(true).await;
        }
        tokio::time::advance(MINUTE).await;

        let blocked = governor.check_and_delay().await;
        assert!(!blocked.allowed);
        assert!(blocked.delay > MINUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_shrinks_with_elapsed_time() {
        let governor = governor(100, 1000);
        governor.record_request(true).await;

        assert_eq!(
            governor.check_and_delay().await.delay,
            Duration::from_millis(200)
        );

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(
            governor.check_and_delay().await.delay,
            Duration::from_millis(50)
        );

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(governor.check_and_delay().await.delay, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_back_off_exponentially_up_to_cap() {
        let governor = governor(100, 1000);

        governor.record_request(false).await;
        assert_eq!(
            governor.check_and_delay().await.delay,
            Duration::from_millis(400)
        );

        for _ in 0..10 {
            governor.record_request(false).await;
        }
        // capped at 2^3
        assert_eq!(
            governor.check_and_delay().await.delay,
            Duration::from_millis(1600)
        );

        governor.record_request(true).await;
        assert_eq!(
            governor.check_and_delay().await.delay,
            Duration::from_millis(200)
        );
        assert_eq!(governor.stats().await.consecutive_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_waits_out_an_exhausted_window() {
        let governor = governor(2, 1000);
        governor.record_request(true).await;
        governor.record_request(true).await;

        let cancel = CancellationToken::new();
        let started = Instant::now();
        assert!(governor.acquire(&cancel).await);
        assert!(started.elapsed() >= Duration::from_secs(59));
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_gives_up_when_cancelled() {
        let governor = governor(1, 1000);
        governor.record_request(true).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!governor.acquire(&cancel).await);
    }

    #[tokio::test(start_paused = true)]
    async fn quota_warning_after_ratio_crossed() {
        let governor = RateGovernor::new(RateLimitConfig {
            requests_per_day: 10,
            quota_warning_ratio: 0.8,
            ..RateLimitConfig::default()
        });

        for _ in 0..7 {
            governor.record_request(true).await;
        }
        assert!(governor.quota_warning().await.is_none());

        governor.record_request(true).await;
        let warning = governor.quota_warning().await.unwrap();
        assert!(warning.contains("8 of 10"), "{warning}");
    }
}
