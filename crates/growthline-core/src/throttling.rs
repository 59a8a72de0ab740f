use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tracing::debug;

use crate::data_source::SourceError;
use crate::provider_policy::{BackoffPolicy, ProviderPolicy};
use crate::ProviderId;

/// Sliding-window call budget for one provider, shared by every entity worker.
#[derive(Clone)]
pub struct ThrottlingQueue {
    provider: ProviderId,
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
    waiting: Arc<AtomicUsize>,
    retry_backoff: BackoffPolicy,
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Counts a waiting call; released on drop so cancelled waits are not leaked.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ThrottlingQueue {
    pub fn new(
        provider: ProviderId,
        quota_window: Duration,
        quota_limit: u32,
        retry_backoff: BackoffPolicy,
    ) -> Self {
        let quota = quota_from_window(quota_window, quota_limit);
        Self {
            provider,
            limiter: Arc::new(RateLimiter::direct(quota)),
            clock: DefaultClock::default(),
            waiting: Arc::new(AtomicUsize::new(0)),
            retry_backoff,
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(
            policy.provider_id,
            policy.quota_window,
            policy.quota_limit,
            policy.retry_backoff.clone(),
        )
    }

    /// Tries to take one unit of budget without waiting. On failure returns how long
    /// until the next unit frees up.
    pub fn acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Waits for budget, giving up with `RateLimited` as soon as the next free unit
    /// lies beyond `max_wait`.
    pub async fn wait_for_budget(&self, max_wait: Duration) -> Result<(), SourceError> {
        let started = Instant::now();
        let wait = match self.acquire() {
            Ok(()) => return Ok(()),
            Err(wait) => wait,
        };

        let _waiting = WaitingGuard::enter(&self.waiting);
        self.wait_loop(started, wait, max_wait).await
    }

    async fn wait_loop(
        &self,
        started: Instant,
        mut wait: Duration,
        max_wait: Duration,
    ) -> Result<(), SourceError> {
        loop {
            let remaining = max_wait.saturating_sub(started.elapsed());
            if wait > remaining {
                return Err(SourceError::rate_limited(format!(
                    "{} call budget exhausted; next slot in {}ms exceeds max wait of {}ms",
                    self.provider,
                    wait.as_millis(),
                    max_wait.as_millis()
                )));
            }

            debug!(provider = %self.provider, wait_ms = wait.as_millis() as u64, "waiting for call budget");
            tokio::time::sleep(wait).await;

            match self.acquire() {
                Ok(()) => return Ok(()),
                Err(next) => wait = next,
            }
        }
    }

    /// Number of calls currently waiting for budget.
    pub fn pending_len(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn retry_delay(&self, retry_count: u32) -> Option<Duration> {
        if retry_count > self.retry_backoff.max_retries {
            return None;
        }

        let scale = self.retry_backoff.multiplier.powf(f64::from(retry_count));
        let seconds = self.retry_backoff.initial_delay.as_secs_f64() * scale;
        let capped_seconds = seconds.min(self.retry_backoff.max_delay.as_secs_f64());
        Some(Duration::from_secs_f64(capped_seconds))
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
