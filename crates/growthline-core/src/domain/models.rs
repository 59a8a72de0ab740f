use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FilerId, FiscalDate, ProviderId, Symbol, ValidationError};

/// Economic quantity tracked per fiscal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    EpsDiluted,
}

impl Metric {
    pub const ALL: [Self; 2] = [Self::Revenue, Self::EpsDiluted];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "revenue",
            Self::EpsDiluted => "eps_diluted",
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "revenue" => Ok(Self::Revenue),
            "eps_diluted" | "eps" => Ok(Self::EpsDiluted),
            other => Err(ValidationError::InvalidMetric {
                value: other.to_owned(),
            }),
        }
    }
}

/// Length of a reported fiscal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Annual,
    Quarterly,
}

impl PeriodKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

impl Display for PeriodKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A company tracked by the run. Owned by the caller and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub symbol: Symbol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filer_id: Option<FilerId>,
}

impl Entity {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            name: None,
            filer_id: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_filer_id(mut self, filer_id: FilerId) -> Self {
        self.filer_id = Some(filer_id);
        self
    }
}

/// One raw fact from the primary filing source, before period classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingFact {
    pub concept: String,
    pub unit: String,
    pub form: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<FiscalDate>,
    pub end: FiscalDate,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filed: Option<FiscalDate>,
}

impl FilingFact {
    /// Covered duration in days, when the fact has a start date.
    pub fn duration_days(&self) -> Option<i64> {
        self.start.map(|start| self.end.days_since(start))
    }

    /// Whether the unit denotes a per-share amount in US dollars.
    pub fn has_per_share_unit(&self) -> bool {
        let unit = self
            .unit
            .to_ascii_lowercase()
            .replace([' ', '-', '_'], "");
        let per_share = ["share", "shr", "shs", "/sh"]
            .iter()
            .any(|marker| unit.contains(marker));
        per_share && unit.contains("usd")
    }

    pub fn has_currency_unit(&self) -> bool {
        self.unit.trim().eq_ignore_ascii_case("usd")
    }
}

/// Company facts document returned by the primary source for one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub facts: Vec<FilingFact>,
}

/// A single reported value, as produced by a provider adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub entity: Symbol,
    pub period_end: FiscalDate,
    pub period_kind: PeriodKind,
    pub metric: Metric,
    pub value: Option<f64>,
    pub concept_label: String,
    pub provider: ProviderId,
}

impl Observation {
    pub fn new(
        entity: Symbol,
        period_end: FiscalDate,
        period_kind: PeriodKind,
        metric: Metric,
        value: Option<f64>,
        concept_label: impl Into<String>,
        provider: ProviderId,
    ) -> Result<Self, ValidationError> {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { field: "value" });
            }
        }

        Ok(Self {
            entity,
            period_end,
            period_kind,
            metric,
            value,
            concept_label: concept_label.into(),
            provider,
        })
    }
}

/// Observations returned by one provider for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    pub observations: Vec<Observation>,
}

impl ObservationSet {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(unit: &str) -> FilingFact {
        FilingFact {
            concept: String::from("EarningsPerShareDiluted"),
            unit: unit.to_owned(),
            form: String::from("10-K"),
            fiscal_period: Some(String::from("FY")),
            start: Some(FiscalDate::parse("2023-01-01").expect("valid")),
            end: FiscalDate::parse("2023-12-31").expect("valid"),
            value: Some(6.13),
            filed: None,
        }
    }

    #[test]
    fn detects_per_share_units() {
        assert!(fact("USD/shares").has_per_share_unit());
        assert!(fact("usd per share").has_per_share_unit());
        assert!(!fact("USD").has_per_share_unit());
        assert!(!fact("shares").has_per_share_unit());
    }

    #[test]
    fn duration_requires_start_date() {
        let mut fact = fact("USD");
        assert_eq!(fact.duration_days(), Some(364));
        fact.start = None;
        assert_eq!(fact.duration_days(), None);
    }

    #[test]
    fn observation_rejects_non_finite_values() {
        let err = Observation::new(
            Symbol::parse("AAPL").expect("valid"),
            FiscalDate::parse("2023-09-30").expect("valid"),
            PeriodKind::Annual,
            Metric::Revenue,
            Some(f64::NAN),
            "Revenues",
            ProviderId::Yahoo,
        )
        .expect_err("NaN must be rejected");
        assert_eq!(err, ValidationError::NonFiniteValue { field: "value" });
    }

    #[test]
    fn parses_metric_aliases() {
        assert_eq!("EPS".parse::<Metric>(), Ok(Metric::EpsDiluted));
        assert_eq!("revenue".parse::<Metric>(), Ok(Metric::Revenue));
    }
}
