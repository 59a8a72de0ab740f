use std::fmt::{Display, Formatter};

use crate::config::{ClassifierConfig, EngineConfig};
use crate::FilingFact;

/// Outcome of classifying one filing fact by the period it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodClass {
    Annual,
    Quarterly,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Neither a full-year form nor a start date to measure the period by.
    NoDuration,
    /// Covered days fall outside both the annual and the quarterly window.
    DurationOutOfRange { days: i64 },
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDuration => f.write_str("period has no start date"),
            Self::DurationOutOfRange { days } => {
                write!(f, "covers {days} days, neither a quarter nor a full year")
            }
        }
    }
}

/// Classifies filing facts as annual, quarterly or rejected.
#[derive(Debug, Clone)]
pub struct PeriodClassifier {
    annual_forms: Vec<String>,
    bounds: ClassifierConfig,
}

impl PeriodClassifier {
    pub fn new(annual_forms: &[String], bounds: ClassifierConfig) -> Self {
        let annual_forms = annual_forms
            .iter()
            .map(|form| form.trim().to_ascii_uppercase())
            .filter(|form| !form.is_empty())
            .collect();
        Self {
            annual_forms,
            bounds,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.annual_forms, config.classifier)
    }

    pub fn classify(&self, fact: &FilingFact) -> PeriodClass {
        let duration = fact.duration_days();
        if self.is_full_year_report(fact) {
            match duration {
                None => return PeriodClass::Annual,
                Some(days) if days >= self.bounds.min_annual_days => return PeriodClass::Annual,
                Some(_) => {}
            }
        }

        match duration {
            Some(days)
                if (self.bounds.quarter_min_days..=self.bounds.quarter_max_days)
                    .contains(&days) =>
            {
                PeriodClass::Quarterly
            }
            Some(days) => PeriodClass::Rejected(RejectReason::DurationOutOfRange { days }),
            None => PeriodClass::Rejected(RejectReason::NoDuration),
        }
    }

    fn is_full_year_report(&self, fact: &FilingFact) -> bool {
        let fiscal_period = fact
            .fiscal_period
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        let full_year_tag =
            fiscal_period.is_empty() || fiscal_period == "FY" || fiscal_period.starts_with("Q4");

        full_year_tag && self.is_annual_form(&fact.form)
    }

    /// Matches a configured form exactly or one of its amendments (`10-K/A`).
    pub fn is_annual_form(&self, form: &str) -> bool {
        let form = form.trim().to_ascii_uppercase();
        self.annual_forms.iter().any(|annual| {
            form == *annual
                || form
                    .strip_prefix(annual.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
