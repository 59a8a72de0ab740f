use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{FiscalDate, Metric, PeriodKind, ProviderId};

/// Largest distance between two quarterly period ends treated as the same quarter.
pub const QUARTER_MATCH_DAYS: i64 = 10;

/// Trust classification of a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Validated,
    Averaged,
    Discrepancy,
    SingleSource,
    PrimarySource,
}

impl ValidationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Averaged => "averaged",
            Self::Discrepancy => "discrepancy",
            Self::SingleSource => "single_source",
            Self::PrimarySource => "primary_source",
        }
    }
}

/// Final value of one (period, metric) cell with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub period_end: FiscalDate,
    pub metric: Metric,
    pub value: f64,
    pub status: ValidationStatus,
    pub sources: Vec<ProviderId>,
    pub concept_label: Option<String>,
    pub discrepancy_pct: Option<f64>,
}

impl ResolvedValue {
    pub fn primary(
        period_end: FiscalDate,
        metric: Metric,
        value: f64,
        concept_label: impl Into<String>,
    ) -> Self {
        Self {
            period_end,
            metric,
            value,
            status: ValidationStatus::PrimarySource,
            sources: vec![ProviderId::Sec],
            concept_label: Some(concept_label.into()),
            discrepancy_pct: None,
        }
    }
}

/// One fiscal period of a series. Holds at most one resolved value per metric.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodEntry {
    period_end: FiscalDate,
    cells: BTreeMap<Metric, ResolvedValue>,
}

impl PeriodEntry {
    fn new(period_end: FiscalDate) -> Self {
        Self {
            period_end,
            cells: BTreeMap::new(),
        }
    }

    pub fn period_end(&self) -> FiscalDate {
        self.period_end
    }

    pub fn cell(&self, metric: Metric) -> Option<&ResolvedValue> {
        self.cells.get(&metric)
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.cell(metric).map(|resolved| resolved.value)
    }

    /// Fills an empty cell. Returns `false`, leaving the entry untouched, when
    /// the cell is already resolved.
    #[must_use]
    pub fn fill(&mut self, resolved: ResolvedValue) -> bool {
        if self.cells.contains_key(&resolved.metric) {
            return false;
        }
        self.cells.insert(resolved.metric, resolved);
        true
    }
}

/// Per-entity time series for one period kind, keyed and ordered by period end.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    kind: PeriodKind,
    entries: BTreeMap<FiscalDate, PeriodEntry>,
}

impl Series {
    pub fn new(kind: PeriodKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, period_end: FiscalDate) -> Option<&PeriodEntry> {
        self.entries.get(&period_end)
    }

    pub fn get_mut(&mut self, period_end: FiscalDate) -> Option<&mut PeriodEntry> {
        self.entries.get_mut(&period_end)
    }

    /// Entry for `period_end`, created empty when absent.
    pub fn entry(&mut self, period_end: FiscalDate) -> &mut PeriodEntry {
        self.entries
            .entry(period_end)
            .or_insert_with(|| PeriodEntry::new(period_end))
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PeriodEntry> {
        self.entries.values()
    }

    pub fn latest(&self) -> Option<&PeriodEntry> {
        self.entries.values().next_back()
    }

    pub fn period_ends(&self) -> Vec<FiscalDate> {
        self.entries.keys().copied().collect()
    }

    /// Existing period end that `candidate` refers to: an exact match first,
    /// otherwise the nearest end in the same fiscal year (annual) or within
    /// [`QUARTER_MATCH_DAYS`] (quarterly).
    pub fn find_matching(&self, candidate: FiscalDate) -> Option<FiscalDate> {
        if self.entries.contains_key(&candidate) {
            return Some(candidate);
        }
        nearest_match(self.kind, candidate, self.entries.keys().copied())
    }

    /// Cells with no resolved value for any of `metrics`, oldest period first.
    pub fn missing_cells(&self, metrics: &[Metric]) -> Vec<(FiscalDate, Metric)> {
        self.entries
            .values()
            .flat_map(|entry| {
                metrics
                    .iter()
                    .filter(|metric| entry.cell(**metric).is_none())
                    .map(|metric| (entry.period_end, *metric))
            })
            .collect()
    }

    /// Keeps the `periods` most recent entries.
    pub fn trim_to(&mut self, periods: usize) {
        while self.entries.len() > periods {
            self.entries.pop_first();
        }
    }

    /// `(period_end, value)` pairs for one metric, oldest first.
    pub fn values(&self, metric: Metric) -> Vec<(FiscalDate, Option<f64>)> {
        self.entries
            .values()
            .map(|entry| (entry.period_end, entry.value(metric)))
            .collect()
    }
}

/// Whether two period ends denote the same fiscal period of `kind`.
pub fn same_period(kind: PeriodKind, left: FiscalDate, right: FiscalDate) -> bool {
    match kind {
        PeriodKind::Annual => left.year() == right.year(),
        PeriodKind::Quarterly => left.days_since(right).abs() <= QUARTER_MATCH_DAYS,
    }
}

/// Exact match or nearest tolerated match of `candidate` among `ends`.
pub fn nearest_match(
    kind: PeriodKind,
    candidate: FiscalDate,
    ends: impl IntoIterator<Item = FiscalDate>,
) -> Option<FiscalDate> {
    ends.into_iter()
        .filter(|end| same_period(kind, *end, candidate))
        .min_by_key(|end| (end.days_since(candidate).abs(), *end))
}
