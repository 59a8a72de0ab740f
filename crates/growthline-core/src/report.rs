//! Output records: one [`EntityReport`] per company and the [`RunReport`] wrapping a run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::growth::GrowthRecord;
use crate::recon::{Issue, PeriodEntry, Series, ValidationStatus};
use crate::{FilerId, FiscalDate, Metric, ProviderId, Symbol, UtcDateTime};

pub const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub value: Option<f64>,
    pub status: Option<ValidationStatus>,
    pub concept_label: Option<String>,
    pub sources: Vec<ProviderId>,
    pub discrepancy_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    pub period_end: FiscalDate,
    pub fiscal_year: i32,
    pub revenue: CellRecord,
    pub eps_diluted: CellRecord,
}

impl PeriodRecord {
    fn from_entry(entry: &PeriodEntry) -> Self {
        let cell = |metric| {
            entry
                .cell(metric)
                .map(|resolved| CellRecord {
                    value: Some(resolved.value),
                    status: Some(resolved.status),
                    concept_label: resolved.concept_label.clone(),
                    sources: resolved.sources.clone(),
                    discrepancy_pct: resolved.discrepancy_pct,
                })
                .unwrap_or_default()
        };
        Self {
            period_end: entry.period_end(),
            fiscal_year: entry.period_end().year(),
            revenue: cell(Metric::Revenue),
            eps_diluted: cell(Metric::EpsDiluted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub code: String,
    pub message: String,
}

impl From<&Issue> for IssueRecord {
    fn from(issue: &Issue) -> Self {
        Self {
            code: issue.code().to_owned(),
            message: issue.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub symbol: Symbol,
    pub filer_id: Option<FilerId>,
    pub name: Option<String>,
    pub extracted_at: UtcDateTime,
    /// Most recent period first.
    pub annual: Vec<PeriodRecord>,
    pub quarterly: Vec<PeriodRecord>,
    pub growth: GrowthRecord,
    pub errors: Vec<IssueRecord>,
}

impl EntityReport {
    pub fn period_records(series: &Series) -> Vec<PeriodRecord> {
        series.iter().rev().map(PeriodRecord::from_entry).collect()
    }

    /// An extraction succeeds when it produced at least one annual period.
    pub fn is_successful(&self) -> bool {
        !self.annual.is_empty()
    }

    pub fn has_entity_failure(&self) -> bool {
        self.errors
            .iter()
            .any(|issue| issue.code == "entity.not_found")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    pub entity_count: usize,
    pub successful_extractions: usize,
    /// Entities that produced no report: cut off by the run deadline or crashed.
    pub abandoned: Vec<Symbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub companies: BTreeMap<Symbol, EntityReport>,
}

impl RunReport {
    pub fn new(
        run_id: impl Into<String>,
        entity_count: usize,
        companies: BTreeMap<Symbol, EntityReport>,
        abandoned: Vec<Symbol>,
    ) -> Self {
        let successful_extractions = companies
            .values()
            .filter(|report| report.is_successful())
            .count();
        Self {
            meta: RunMeta {
                run_id: run_id.into(),
                schema_version: SCHEMA_VERSION.to_owned(),
                generated_at: UtcDateTime::now(),
                entity_count,
                successful_extractions,
                abandoned,
            },
            companies,
        }
    }

    pub fn entity_failures(&self) -> usize {
        self.companies
            .values()
            .filter(|report| report.has_entity_failure())
            .count()
    }

    pub fn issue_count(&self) -> usize {
        self.companies.values().map(|report| report.errors.len()).sum()
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
