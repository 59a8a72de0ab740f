use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, ObservationRequest, SourceError, SourceErrorKind,
    SourceFuture,
};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::ThrottlingQueue;
use crate::{CompanyFacts, Entity, ObservationSet, ProviderId};

/// Source snapshot used by the `sources` CLI command.
#[derive(Debug, Clone, Copy)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub quota_limit: u32,
    pub quota_window: Duration,
    pub max_wait: Duration,
    pub pending: usize,
}

impl SourceSnapshot {
    pub fn status_label(self) -> &'static str {
        if self.pending > 0 {
            "throttled"
        } else {
            "ready"
        }
    }
}

struct Lane {
    adapter: Arc<dyn DataSource>,
    policy: ProviderPolicy,
    throttle: ThrottlingQueue,
    permits: Arc<Semaphore>,
}

/// Adapter registry. Owns the per-provider call budgets that all entities share.
pub struct SourceRouter {
    lanes: HashMap<ProviderId, Lane>,
}

impl SourceRouter {
    pub fn new(adapters: Vec<Arc<dyn DataSource>>) -> Self {
        Self::with_policies(adapters, Vec::new())
    }

    /// Registers adapters, using `policies` where given and provider defaults otherwise.
    pub fn with_policies(
        adapters: Vec<Arc<dyn DataSource>>,
        policies: impl IntoIterator<Item = ProviderPolicy>,
    ) -> Self {
        let mut overrides = policies
            .into_iter()
            .map(|policy| (policy.provider_id, policy))
            .collect::<HashMap<_, _>>();

        let lanes = adapters
            .into_iter()
            .map(|adapter| {
                let id = adapter.id();
                let policy = overrides
                    .remove(&id)
                    .unwrap_or_else(|| ProviderPolicy::default_for(id));
                let lane = Lane {
                    throttle: ThrottlingQueue::from_policy(&policy),
                    permits: Arc::new(Semaphore::new(policy.max_concurrency.max(1))),
                    adapter,
                    policy,
                };
                (id, lane)
            })
            .collect();

        Self { lanes }
    }

    pub fn is_registered(&self, provider: ProviderId) -> bool {
        self.lanes.contains_key(&provider)
    }

    /// Priority chain for `endpoint`: configured order, duplicates removed, keeping only
    /// registered providers that support the endpoint.
    pub fn chain_for(&self, endpoint: Endpoint, priority: &[ProviderId]) -> Vec<ProviderId> {
        dedupe_chain(priority)
            .into_iter()
            .filter(|provider| {
                self.lanes
                    .get(provider)
                    .is_some_and(|lane| lane.adapter.capabilities().supports(endpoint))
            })
            .collect()
    }

    pub fn snapshot(&self, provider: ProviderId) -> Option<SourceSnapshot> {
        let lane = self.lanes.get(&provider)?;
        Some(SourceSnapshot {
            id: provider,
            capabilities: lane.adapter.capabilities(),
            quota_limit: lane.policy.quota_limit,
            quota_window: lane.policy.quota_window,
            max_wait: lane.policy.max_wait,
            pending: lane.throttle.pending_len(),
        })
    }

    pub fn registered_sources(&self) -> Vec<ProviderId> {
        let mut providers = self.lanes.keys().copied().collect::<Vec<_>>();
        providers.sort();
        providers
    }

    pub async fn company_facts(
        &self,
        provider: ProviderId,
        entity: &Entity,
    ) -> Result<CompanyFacts, SourceError> {
        let entity = entity.clone();
        self.invoke(provider, Endpoint::CompanyFacts, move |source| {
            source.company_facts(entity.clone())
        })
        .await
    }

    pub async fn observations(
        &self,
        provider: ProviderId,
        req: &ObservationRequest,
    ) -> Result<ObservationSet, SourceError> {
        let req = req.clone();
        self.invoke(provider, req.endpoint(), move |source| {
            source.observations(req.clone())
        })
        .await
    }

    async fn invoke<T, F>(
        &self,
        provider: ProviderId,
        endpoint: Endpoint,
        mut call: F,
    ) -> Result<T, SourceError>
    where
        F: for<'a> FnMut(&'a dyn DataSource) -> SourceFuture<'a, T>,
    {
        let lane = self
            .lanes
            .get(&provider)
            .ok_or_else(|| SourceError::adapter_not_registered(provider))?;
        if !lane.adapter.capabilities().supports(endpoint) {
            return Err(SourceError::unsupported_endpoint(endpoint));
        }

        let _permit = lane
            .permits
            .acquire()
            .await
            .map_err(|_| SourceError::rate_limited(format!("{provider} lane is closed")))?;

        let started = Instant::now();
        let mut retry_count = 0;
        loop {
            let remaining = lane.policy.max_wait.saturating_sub(started.elapsed());
            lane.throttle.wait_for_budget(remaining).await?;

            debug!(provider = %provider, endpoint = %endpoint, "calling source");
            let error = match call(lane.adapter.as_ref()).await {
                Ok(data) => return Ok(data),
                Err(error) => error,
            };

            let retry_after = (error.kind() == SourceErrorKind::RateLimited && error.retryable())
                .then(|| lane.throttle.retry_delay(retry_count))
                .flatten()
                .filter(|delay| started.elapsed() + *delay <= lane.policy.max_wait);
            let Some(delay) = retry_after else {
                return Err(error);
            };

            warn!(
                provider = %provider,
                retry = retry_count + 1,
                delay_ms = delay.as_millis() as u64,
                "source reported rate limiting; backing off"
            );
            tokio::time::sleep(delay).await;
            retry_count += 1;
        }
    }
}

fn dedupe_chain(chain: &[ProviderId]) -> Vec<ProviderId> {
    let mut seen = HashSet::new();
    let mut output = Vec::with_capacity(chain.len());

    for provider in chain {
        if seen.insert(*provider) {
            output.push(*provider);
        }
    }

    output
}
