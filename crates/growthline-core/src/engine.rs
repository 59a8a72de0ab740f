use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::data_source::SourceErrorKind;
use crate::growth::GrowthRecord;
use crate::recon::{extract_primary, FallbackOrchestrator, Issue, PrimaryExtraction};
use crate::report::{EntityReport, IssueRecord};
use crate::routing::SourceRouter;
use crate::{Entity, FiscalDate, ProviderId, Symbol, UtcDateTime};

/// Per-run knobs that are not part of the engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Reference date for provider lookback windows. Defaults to today (UTC).
    pub as_of: Option<FiscalDate>,
    /// Entities still running when it expires are abandoned.
    pub deadline: Option<Duration>,
}

/// Reports of a finished run, plus entities cut off by the deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub entity_count: usize,
    pub companies: BTreeMap<Symbol, EntityReport>,
    /// In universe order.
    pub abandoned: Vec<Symbol>,
}

/// Reconciliation engine. Cheap to clone; clones share the router and its call budgets.
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    router: Arc<SourceRouter>,
}

impl Engine {
    pub fn new(config: EngineConfig, router: SourceRouter) -> Self {
        Self {
            config: Arc::new(config),
            router: Arc::new(router),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn router(&self) -> &SourceRouter {
        &self.router
    }

    /// Runs the full pipeline for one entity. Never fails: every problem ends up
    /// in the report's `errors`.
    pub async fn reconcile_entity(&self, entity: &Entity, as_of: FiscalDate) -> EntityReport {
        let extracted_at = UtcDateTime::now();
        let mut issues = Vec::new();
        let mut name = entity.name.clone();

        let primary = match self.router.company_facts(ProviderId::Sec, entity).await {
            Ok(facts) => {
                if name.is_none() {
                    name = facts.entity_name.clone();
                }
                extract_primary(&facts, &self.config)
            }
            Err(error) if error.kind() == SourceErrorKind::NotFound => {
                warn!(symbol = %entity.symbol, code = error.code(), "entity not found in primary source");
                issues.push(Issue::EntityNotFound { error });
                return self.finish(entity, name, extracted_at, PrimaryExtraction::empty(), issues);
            }
            Err(error) => {
                warn!(
                    symbol = %entity.symbol,
                    code = error.code(),
                    "primary source unavailable; continuing on fallback data"
                );
                issues.push(Issue::ProviderUnavailable {
                    provider: ProviderId::Sec,
                    scope: None,
                    error,
                });
                PrimaryExtraction::empty()
            }
        };

        let PrimaryExtraction {
            mut annual,
            mut quarterly,
            issues: primary_issues,
        } = primary;
        issues.extend(primary_issues);

        let orchestrator = FallbackOrchestrator::new(Arc::clone(&self.router), Arc::clone(&self.config));
        let (annual_issues, quarterly_issues) = tokio::join!(
            orchestrator.fill(entity, &mut annual, as_of),
            orchestrator.fill(entity, &mut quarterly, as_of),
        );
        issues.extend(annual_issues);
        issues.extend(quarterly_issues);

        let extraction = PrimaryExtraction {
            annual,
            quarterly,
            issues: Vec::new(),
        };
        self.finish(entity, name, extracted_at, extraction, issues)
    }

    fn finish(
        &self,
        entity: &Entity,
        name: Option<String>,
        extracted_at: UtcDateTime,
        extraction: PrimaryExtraction,
        issues: Vec<Issue>,
    ) -> EntityReport {
        let growth = GrowthRecord::compute(
            &extraction.annual,
            &extraction.quarterly,
            self.config.max_quarter_gap_days,
        );
        let report = EntityReport {
            symbol: entity.symbol.clone(),
            filer_id: entity.filer_id.clone(),
            name,
            extracted_at,
            annual: EntityReport::period_records(&extraction.annual),
            quarterly: EntityReport::period_records(&extraction.quarterly),
            growth,
            errors: issues.iter().map(IssueRecord::from).collect(),
        };

        info!(
            symbol = %report.symbol,
            annual_periods = report.annual.len(),
            quarterly_periods = report.quarterly.len(),
            issues = report.errors.len(),
            "entity reconciled"
        );
        report
    }

    /// Reconciles every entity on a bounded worker pool. Duplicate symbols are
    /// processed once.
    pub async fn run_universe(&self, universe: Vec<Entity>, options: RunOptions) -> RunOutcome {
        let as_of = options.as_of.unwrap_or_else(FiscalDate::today_utc);
        let mut seen = HashSet::new();
        let universe = universe
            .into_iter()
            .filter(|entity| {
                let fresh = seen.insert(entity.symbol.clone());
                if !fresh {
                    warn!(symbol = %entity.symbol, "duplicate entity in universe; skipping");
                }
                fresh
            })
            .collect::<Vec<_>>();

        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_entities.max(1)));
        let mut workers = JoinSet::new();
        for entity in universe.iter().cloned() {
            let engine = self.clone();
            let permits = Arc::clone(&permits);
            workers.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                Some(engine.reconcile_entity(&entity, as_of).await)
            });
        }
        debug!(entities = universe.len(), "run started");

        let deadline = options
            .deadline
            .map(|budget| tokio::time::Instant::now() + budget);
        let mut companies = BTreeMap::new();
        loop {
            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, workers.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(in_flight = workers.len(), "run deadline expired");
                        break;
                    }
                },
                None => workers.join_next().await,
            };
            match joined {
                None => break,
                Some(Ok(Some(report))) => {
                    companies.insert(report.symbol.clone(), report);
                }
                Some(Ok(None)) => {}
                Some(Err(error)) => warn!(%error, "entity worker failed"),
            }
        }
        workers.abort_all();

        let abandoned = universe
            .iter()
            .map(|entity| entity.symbol.clone())
            .filter(|symbol| !companies.contains_key(symbol))
            .collect::<Vec<_>>();
        for symbol in &abandoned {
            warn!(%symbol, "entity abandoned");
        }

        RunOutcome {
            entity_count: universe.len(),
            companies,
            abandoned,
        }
    }
}
