use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::config::EngineConfig;
use crate::recon::classify::{PeriodClass, PeriodClassifier};
use crate::recon::concept::ConceptSelector;
use crate::recon::issues::Issue;
use crate::recon::series::{ResolvedValue, Series};
use crate::{CompanyFacts, FilingFact, FiscalDate, Metric, PeriodKind};

/// Series built from primary-source filings alone.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryExtraction {
    pub annual: Series,
    pub quarterly: Series,
    pub issues: Vec<Issue>,
}

impl PrimaryExtraction {
    pub fn empty() -> Self {
        Self {
            annual: Series::new(PeriodKind::Annual),
            quarterly: Series::new(PeriodKind::Quarterly),
            issues: Vec::new(),
        }
    }
}

/// Classifies, deduplicates and selects primary-source facts into annual and
/// quarterly series, each limited to the configured lookback.
pub fn extract_primary(facts: &CompanyFacts, config: &EngineConfig) -> PrimaryExtraction {
    let classifier = PeriodClassifier::from_config(config);
    let mut extraction = PrimaryExtraction::empty();
    let mut rejected = BTreeSet::new();
    let per_share_concepts = facts
        .facts
        .iter()
        .filter(|fact| fact.has_per_share_unit())
        .map(|fact| fact.concept.as_str())
        .collect::<HashSet<_>>();

    for metric in Metric::ALL {
        let selector = ConceptSelector::new(config.concepts.for_metric(metric));
        let mut annual: HashMap<usize, Vec<&FilingFact>> = HashMap::new();
        let mut quarterly: HashMap<usize, Vec<&FilingFact>> = HashMap::new();

        for fact in &facts.facts {
            if !has_metric_unit(fact, metric, &per_share_concepts) {
                continue;
            }
            let Some(rank) = selector.rank(&fact.concept) else {
                continue;
            };

            match classifier.classify(fact) {
                PeriodClass::Annual => annual.entry(rank).or_default().push(fact),
                PeriodClass::Quarterly => quarterly.entry(rank).or_default().push(fact),
                PeriodClass::Rejected(reason) => {
                    debug!(
                        concept = %fact.concept,
                        period_end = %fact.end,
                        form = %fact.form,
                        %reason,
                        "rejected filing period"
                    );
                    if rejected.insert((metric, fact.end)) {
                        extraction.issues.push(Issue::PeriodRejected {
                            metric,
                            period_end: fact.end,
                            reason,
                        });
                    }
                }
            }
        }

        fill_series(&mut extraction.annual, metric, &selector, annual, config);
        fill_series(&mut extraction.quarterly, metric, &selector, quarterly, config);
    }

    extraction
}

fn fill_series(
    series: &mut Series,
    metric: Metric,
    selector: &ConceptSelector<'_>,
    candidates: HashMap<usize, Vec<&FilingFact>>,
    config: &EngineConfig,
) {
    let deduped = candidates
        .into_iter()
        .map(|(rank, facts)| (rank, latest_filed_per_end(facts)))
        .collect::<HashMap<_, _>>();

    let Some(choice) = selector.select(&deduped) else {
        debug!(kind = %series.kind(), %metric, "no primary concept candidate");
        return;
    };
    debug!(
        kind = %series.kind(),
        %metric,
        concept = %choice.label,
        latest_end = %choice.latest_end,
        "selected primary concept"
    );

    let Some(rank) = selector.rank(&choice.label) else {
        return;
    };
    let mut chosen = deduped.get(&rank).cloned().unwrap_or_default();
    chosen.sort_by(|left, right| right.end.cmp(&left.end));

    for fact in chosen.into_iter().take(config.lookback(series.kind())) {
        let entry = series.entry(fact.end);
        if let Some(value) = fact.value {
            let _ = entry.fill(ResolvedValue::primary(
                fact.end,
                metric,
                value,
                choice.label.clone(),
            ));
        }
    }
}

/// One fact per period end: the most recently filed one. Undated filings lose
/// to dated ones; among equals the later fact in input order wins.
fn latest_filed_per_end(facts: Vec<&FilingFact>) -> Vec<&FilingFact> {
    let mut by_end: HashMap<FiscalDate, &FilingFact> = HashMap::new();
    for fact in facts {
        match by_end.get(&fact.end) {
            Some(current) if fact.filed < current.filed => {}
            _ => {
                by_end.insert(fact.end, fact);
            }
        }
    }
    by_end.into_values().collect()
}

/// EPS takes per-share facts, or plain `USD` facts for a concept that has
/// no per-share facts at all.
fn has_metric_unit(fact: &FilingFact, metric: Metric, per_share_concepts: &HashSet<&str>) -> bool {
    match metric {
        Metric::Revenue => fact.has_currency_unit(),
        Metric::EpsDiluted => {
            fact.has_per_share_unit()
                || (fact.has_currency_unit() && !per_share_concepts.contains(fact.concept.as_str()))
        }
    }
}
