use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, ObservationRequest, SourceError, SourceFuture,
};
use crate::{
    CompanyFacts, CoreError, Entity, FiscalDate, Metric, Observation, ObservationSet, PeriodKind,
    ProviderId, Symbol,
};

/// Previously fetched provider data, replayed through the adapter contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub universe: Vec<Entity>,
    /// Primary-source filings keyed by symbol.
    #[serde(default)]
    pub company_facts: BTreeMap<Symbol, CompanyFacts>,
    #[serde(default)]
    pub providers: BTreeMap<ProviderId, ProviderSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    /// When set, every call to this provider fails with the given error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureSpec>,
    #[serde(default)]
    pub annual: BTreeMap<Symbol, MetricSeries>,
    #[serde(default)]
    pub quarterly: BTreeMap<Symbol, MetricSeries>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    #[serde(default)]
    pub revenue: Vec<SnapshotPoint>,
    #[serde(default)]
    pub eps_diluted: Vec<SnapshotPoint>,
}

impl MetricSeries {
    fn points(&self, metric: Metric) -> &[SnapshotPoint] {
        match metric {
            Metric::Revenue => &self.revenue,
            Metric::EpsDiluted => &self.eps_diluted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPoint {
    pub period_end: FiscalDate,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureSpec {
    pub kind: FailureKind,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    AuthFailed,
    NotFound,
    Malformed,
}

impl FailureSpec {
    fn to_error(&self, provider: ProviderId) -> SourceError {
        let message = if self.message.is_empty() {
            format!("{provider} snapshot marks the provider as failing")
        } else {
            self.message.clone()
        };
        match self.kind {
            FailureKind::RateLimited => SourceError::rate_limited(message),
            FailureKind::AuthFailed => SourceError::auth_failed(message),
            FailureKind::NotFound => SourceError::not_found(message),
            FailureKind::Malformed => SourceError::malformed(message),
        }
    }
}

impl Snapshot {
    pub fn from_json(input: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(input)?)
    }

    /// One adapter per provider present in the snapshot. The primary source is
    /// registered whenever company facts are present.
    pub fn sources(snapshot: &Arc<Self>) -> Vec<Arc<dyn DataSource>> {
        let mut sources: Vec<Arc<dyn DataSource>> = Vec::new();
        if !snapshot.company_facts.is_empty() || snapshot.providers.contains_key(&ProviderId::Sec)
        {
            sources.push(Arc::new(SnapshotSource::new(
                ProviderId::Sec,
                Arc::clone(snapshot),
            )));
        }
        for provider in snapshot.providers.keys().copied() {
            if !provider.is_primary() {
                sources.push(Arc::new(SnapshotSource::new(provider, Arc::clone(snapshot))));
            }
        }
        sources
    }
}

/// Adapter serving one provider's slice of a [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    id: ProviderId,
    data: Arc<Snapshot>,
}

impl SnapshotSource {
    pub fn new(id: ProviderId, data: Arc<Snapshot>) -> Self {
        Self { id, data }
    }

    fn failure(&self) -> Option<SourceError> {
        self.data
            .providers
            .get(&self.id)
            .and_then(|provider| provider.failure.as_ref())
            .map(|failure| failure.to_error(self.id))
    }

    fn load_facts(&self, entity: &Entity) -> Result<CompanyFacts, SourceError> {
        if let Some(error) = self.failure() {
            return Err(error);
        }
        self.data
            .company_facts
            .get(&entity.symbol)
            .cloned()
            .ok_or_else(|| {
                SourceError::not_found(format!("no filings for '{}'", entity.symbol))
            })
    }

    fn load_observations(&self, req: &ObservationRequest) -> Result<ObservationSet, SourceError> {
        if let Some(error) = self.failure() {
            return Err(error);
        }

        let provider = self.data.providers.get(&self.id).ok_or_else(|| {
            SourceError::not_found(format!("{} has no snapshot data", self.id))
        })?;
        let by_symbol = match req.kind {
            PeriodKind::Annual => &provider.annual,
            PeriodKind::Quarterly => &provider.quarterly,
        };
        let series = by_symbol.get(&req.entity.symbol).ok_or_else(|| {
            SourceError::not_found(format!(
                "{} has no {} data for '{}'",
                self.id, req.kind, req.entity.symbol
            ))
        })?;

        let mut observations = series
            .points(req.metric)
            .iter()
            .filter(|point| req.range.contains(point.period_end))
            .map(|point| {
                let label = point
                    .concept_label
                    .clone()
                    .unwrap_or_else(|| format!("{}:{}", self.id, req.metric));
                Observation::new(
                    req.entity.symbol.clone(),
                    point.period_end,
                    req.kind,
                    req.metric,
                    point.value,
                    label,
                    self.id,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        observations.sort_by_key(|observation| observation.period_end);

        Ok(ObservationSet::new(observations))
    }
}

impl DataSource for SnapshotSource {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn capabilities(&self) -> CapabilitySet {
        if self.id.is_primary() {
            CapabilitySet::new(true, false, false)
        } else {
            CapabilitySet::series_only()
        }
    }

    fn company_facts<'a>(&'a self, entity: Entity) -> SourceFuture<'a, CompanyFacts> {
        Box::pin(async move {
            if !self.capabilities().supports(Endpoint::CompanyFacts) {
                return Err(SourceError::unsupported_endpoint(Endpoint::CompanyFacts));
            }
            self.load_facts(&entity)
        })
    }

    fn observations<'a>(&'a self, req: ObservationRequest) -> SourceFuture<'a, ObservationSet> {
        Box::pin(async move {
            if !self.capabilities().supports(req.endpoint()) {
                return Err(SourceError::unsupported_endpoint(req.endpoint()));
            }
            self.load_observations(&req)
        })
    }
}
