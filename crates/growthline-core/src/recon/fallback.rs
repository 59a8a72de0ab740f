use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::data_source::{Endpoint, ObservationRequest, PeriodRange, SourceError};
use crate::recon::issues::Issue;
use crate::recon::series::{nearest_match, ResolvedValue, Series, ValidationStatus};
use crate::recon::validate::CrossValidator;
use crate::routing::SourceRouter;
use crate::{Entity, FiscalDate, Metric, PeriodKind, ProviderId};

/// What a series lacks, decided once before any provider is queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPlan {
    pub kind: PeriodKind,
    pub missing: BTreeSet<(FiscalDate, Metric)>,
    /// The series holds fewer periods than the lookback asks for.
    pub needs_more_periods: bool,
}

impl FallbackPlan {
    pub fn compute(series: &Series, lookback: usize) -> Self {
        Self {
            kind: series.kind(),
            missing: series.missing_cells(&Metric::ALL).into_iter().collect(),
            needs_more_periods: series.len() < lookback,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && !self.needs_more_periods
    }

    /// Metrics worth querying: every metric when new periods are needed,
    /// otherwise only those with missing cells.
    pub fn metrics(&self) -> Vec<Metric> {
        Metric::ALL
            .into_iter()
            .filter(|metric| {
                self.needs_more_periods || self.missing.iter().any(|(_, missing)| missing == metric)
            })
            .collect()
    }
}

/// One non-null value a provider reported, with the provider's own concept label.
#[derive(Debug, Clone, PartialEq)]
struct ReportedPoint {
    period_end: FiscalDate,
    value: f64,
    concept_label: String,
}

impl ReportedPoint {
    fn new(period_end: FiscalDate, value: f64, concept_label: impl Into<String>) -> Self {
        Self {
            period_end,
            value,
            concept_label: concept_label.into(),
        }
    }
}

/// Observations one provider returned for one metric.
type Reported = HashMap<(ProviderId, Metric), Vec<ReportedPoint>>;

/// Fills gaps in a primary series from secondary providers.
pub struct FallbackOrchestrator {
    router: Arc<SourceRouter>,
    config: Arc<EngineConfig>,
}

impl FallbackOrchestrator {
    pub fn new(router: Arc<SourceRouter>, config: Arc<EngineConfig>) -> Self {
        Self { router, config }
    }

    /// Resolves missing cells of `series` and, when it is short, adds periods
    /// reported by secondary providers. Returns the issues met along the way.
    pub async fn fill(&self, entity: &Entity, series: &mut Series, as_of: FiscalDate) -> Vec<Issue> {
        let kind = series.kind();
        let lookback = self.config.lookback(kind);
        let plan = FallbackPlan::compute(series, lookback);
        let mut issues = Vec::new();

        if plan.is_empty() {
            return issues;
        }

        let chain = self
            .router
            .chain_for(Endpoint::for_kind(kind), self.config.fallback.for_kind(kind));
        debug!(
            symbol = %entity.symbol,
            %kind,
            missing = plan.missing.len(),
            needs_more_periods = plan.needs_more_periods,
            providers = chain.len(),
            "planned fallback"
        );

        let reported = if chain.is_empty() {
            Reported::new()
        } else {
            let range = lookback_range(kind, lookback, as_of);
            self.query_all(entity, kind, &plan.metrics(), &chain, range, &mut issues)
                .await
        };

        if plan.needs_more_periods {
            add_reported_periods(series, &chain, &plan.metrics(), &reported);
        }

        let validator = CrossValidator::new(self.config.tolerance);
        let queried = plan.metrics();
        for (period_end, metric) in series.missing_cells(&queried) {
            let matched = chain
                .iter()
                .filter_map(|provider| {
                    let points = reported.get(&(*provider, metric))?;
                    let ends = points.iter().map(|point| point.period_end);
                    let end = nearest_match(kind, period_end, ends)?;
                    points
                        .iter()
                        .find(|point| point.period_end == end)
                        .map(|point| (*provider, point))
                })
                .collect::<Vec<_>>();
            let reports = matched
                .iter()
                .map(|(provider, point)| (*provider, point.value))
                .collect::<Vec<_>>();

            let Some(reconciled) = validator.reconcile(&reports) else {
                continue;
            };
            let label = fallback_label(reconciled.status, &matched);
            if let Some(entry) = series.get_mut(period_end) {
                let _ = entry.fill(ResolvedValue {
                    period_end,
                    metric,
                    value: reconciled.value,
                    status: reconciled.status,
                    sources: reconciled.sources,
                    concept_label: Some(label),
                    discrepancy_pct: reconciled.discrepancy_pct,
                });
            }
        }

        series.trim_to(lookback);

        for (period_end, metric) in series.missing_cells(&Metric::ALL) {
            issues.push(Issue::CellUnresolvable {
                kind,
                metric,
                period_end,
            });
        }

        issues
    }

    /// Queries every provider once per metric, concurrently, and waits for all of them.
    async fn query_all(
        &self,
        entity: &Entity,
        kind: PeriodKind,
        metrics: &[Metric],
        chain: &[ProviderId],
        range: PeriodRange,
        issues: &mut Vec<Issue>,
    ) -> Reported {
        let mut calls = JoinSet::new();
        for metric in metrics {
            for provider in chain {
                let router = Arc::clone(&self.router);
                let request = ObservationRequest::new(entity.clone(), kind, *metric, range);
                let provider = *provider;
                let metric = *metric;
                calls.spawn(async move {
                    let result = router.observations(provider, &request).await;
                    (provider, metric, result)
                });
            }
        }

        let mut outcomes = Vec::with_capacity(calls.len());
        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(error) => warn!(symbol = %entity.symbol, %error, "provider call task failed"),
            }
        }
        outcomes.sort_by_key(|(provider, metric, _)| (*metric, priority_of(chain, *provider)));

        let mut reported = Reported::new();
        for (provider, metric, result) in outcomes {
            match result {
                Ok(set) => {
                    let points = set
                        .observations
                        .into_iter()
                        .filter_map(|observation| {
                            let value = observation.value?;
                            Some(ReportedPoint::new(
                                observation.period_end,
                                value,
                                observation.concept_label,
                            ))
                        })
                        .collect();
                    reported.insert((provider, metric), points);
                }
                Err(error) => {
                    record_failure(entity, provider, kind, metric, error, issues);
                }
            }
        }
        reported
    }
}

fn record_failure(
    entity: &Entity,
    provider: ProviderId,
    kind: PeriodKind,
    metric: Metric,
    error: SourceError,
    issues: &mut Vec<Issue>,
) {
    warn!(
        symbol = %entity.symbol,
        %provider,
        %kind,
        %metric,
        code = error.code(),
        "fallback provider unavailable"
    );
    issues.push(Issue::ProviderUnavailable {
        provider,
        scope: Some((kind, metric)),
        error,
    });
}

/// A single report keeps the provider's own concept label. Combined reports
/// are labeled by the providers that contributed, in priority order.
fn fallback_label(status: ValidationStatus, matched: &[(ProviderId, &ReportedPoint)]) -> String {
    match (status, matched) {
        (ValidationStatus::SingleSource, [(_, point)]) => point.concept_label.clone(),
        _ => {
            let providers = matched
                .iter()
                .map(|(provider, _)| provider.as_str())
                .collect::<Vec<_>>()
                .join(",");
            format!("fallback:{providers}")
        }
    }
}

fn priority_of(chain: &[ProviderId], provider: ProviderId) -> usize {
    chain
        .iter()
        .position(|candidate| *candidate == provider)
        .unwrap_or(chain.len())
}

/// Adds every reported period not already in `series`. A period reported by
/// several providers takes its end date from the highest-priority one.
fn add_reported_periods(
    series: &mut Series,
    chain: &[ProviderId],
    metrics: &[Metric],
    reported: &Reported,
) {
    for provider in chain {
        for metric in metrics {
            let Some(points) = reported.get(&(*provider, *metric)) else {
                continue;
            };
            for point in points {
                if series.find_matching(point.period_end).is_none() {
                    series.entry(point.period_end);
                }
            }
        }
    }
}

/// Period-end range covering `lookback` periods before `as_of`, plus one
/// period of slack for fiscal years that end early in the calendar year.
fn lookback_range(kind: PeriodKind, lookback: usize, as_of: FiscalDate) -> PeriodRange {
    let periods = u32::try_from(lookback).unwrap_or(u32::MAX);
    let years = match kind {
        PeriodKind::Annual => periods.saturating_add(1),
        PeriodKind::Quarterly => periods.div_ceil(4).saturating_add(1),
    };
    PeriodRange::trailing_years(as_of, years)
}
