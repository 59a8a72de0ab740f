use std::time::Duration;

use crate::ProviderId;

/// Call budget and waiting behavior for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub max_concurrency: usize,
    pub quota_window: Duration,
    pub quota_limit: u32,
    /// Longest a call may wait for budget before failing with `RateLimited`.
    pub max_wait: Duration,
    pub retry_backoff: BackoffPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_retries: u32,
}

impl BackoffPolicy {
    const fn standard(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier: 2.0,
            max_retries: 3,
        }
    }
}

impl ProviderPolicy {
    /// Fair-access limit of the filings API: ten requests per second.
    pub fn sec_default() -> Self {
        Self {
            provider_id: ProviderId::Sec,
            max_concurrency: 4,
            quota_window: Duration::from_secs(1),
            quota_limit: 10,
            max_wait: Duration::from_secs(30),
            retry_backoff: BackoffPolicy::standard(
                Duration::from_millis(100),
                Duration::from_secs(5),
            ),
        }
    }

    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            max_concurrency: 4,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            max_wait: Duration::from_secs(30),
            retry_backoff: BackoffPolicy::standard(
                Duration::from_millis(500),
                Duration::from_secs(30),
            ),
        }
    }

    pub fn alphavantage_default() -> Self {
        Self {
            provider_id: ProviderId::Alphavantage,
            max_concurrency: 1,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
            max_wait: Duration::from_secs(60),
            retry_backoff: BackoffPolicy::standard(Duration::from_secs(1), Duration::from_secs(60)),
        }
    }

    pub fn finnhub_default() -> Self {
        Self {
            provider_id: ProviderId::Finnhub,
            max_concurrency: 2,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            max_wait: Duration::from_secs(30),
            retry_backoff: BackoffPolicy::standard(
                Duration::from_millis(500),
                Duration::from_secs(30),
            ),
        }
    }

    pub fn finnhub_as_reported_default() -> Self {
        Self {
            provider_id: ProviderId::FinnhubAsReported,
            ..Self::finnhub_default()
        }
    }

    /// Free tier: 250 calls per day. Waiting is pointless, so budget exhaustion fails fast.
    pub fn fmp_default() -> Self {
        Self {
            provider_id: ProviderId::Fmp,
            max_concurrency: 1,
            quota_window: Duration::from_secs(24 * 60 * 60),
            quota_limit: 250,
            max_wait: Duration::from_secs(5),
            retry_backoff: BackoffPolicy::standard(Duration::from_secs(1), Duration::from_secs(5)),
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Sec => Self::sec_default(),
            ProviderId::Yahoo => Self::yahoo_default(),
            ProviderId::Alphavantage => Self::alphavantage_default(),
            ProviderId::Finnhub => Self::finnhub_default(),
            ProviderId::FinnhubAsReported => Self::finnhub_as_reported_default(),
            ProviderId::Fmp => Self::fmp_default(),
        }
    }
}
