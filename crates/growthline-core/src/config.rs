//! Engine configuration, loaded from YAML.
//!
//! Every field has a default, so an empty document is a valid configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider_policy::ProviderPolicy;
use crate::{ConfigError, Metric, PeriodKind, ProviderId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Annual lookback, in fiscal years.
    pub years_to_fetch: u32,
    /// Quarterly lookback, in quarters.
    pub quarters_to_fetch: u32,
    pub concepts: ConceptConfig,
    /// Form types that denote a full-year report. Amendments (`10-K/A`) match their base form.
    pub annual_forms: Vec<String>,
    pub classifier: ClassifierConfig,
    pub tolerance: ToleranceConfig,
    /// Largest gap between consecutive quarter ends still considered contiguous.
    pub max_quarter_gap_days: i64,
    pub fallback: FallbackConfig,
    pub max_concurrent_entities: usize,
    pub providers: BTreeMap<ProviderId, ProviderPolicyConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            years_to_fetch: 6,
            quarters_to_fetch: 8,
            concepts: ConceptConfig::default(),
            annual_forms: vec![
                String::from("10-K"),
                String::from("20-F"),
                String::from("40-F"),
            ],
            classifier: ClassifierConfig::default(),
            tolerance: ToleranceConfig::default(),
            max_quarter_gap_days: 100,
            fallback: FallbackConfig::default(),
            max_concurrent_entities: 8,
            providers: BTreeMap::new(),
        }
    }
}

/// Concept labels per metric, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConceptConfig {
    pub revenue: Vec<String>,
    pub eps_diluted: Vec<String>,
}

impl ConceptConfig {
    pub fn for_metric(&self, metric: Metric) -> &[String] {
        match metric {
            Metric::Revenue => &self.revenue,
            Metric::EpsDiluted => &self.eps_diluted,
        }
    }
}

impl Default for ConceptConfig {
    fn default() -> Self {
        let labels = |values: &[&str]| values.iter().map(|value| (*value).to_owned()).collect();
        Self {
            revenue: labels(&[
                "RevenueFromContractWithCustomerExcludingAssessedTax",
                "Revenues",
                "SalesRevenueNet",
                "RevenueFromContractWithCustomerIncludingAssessedTax",
                "RevenuesNetOfInterestExpense",
            ]),
            eps_diluted: labels(&[
                "EarningsPerShareDiluted",
                "EarningsPerShareBasicAndDiluted",
            ]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub min_annual_days: i64,
    pub quarter_min_days: i64,
    pub quarter_max_days: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_annual_days: 300,
            quarter_min_days: 60,
            quarter_max_days: 120,
        }
    }
}

/// Discrepancy thresholds in percent, compared inclusively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleranceConfig {
    pub validated_pct: f64,
    pub averaged_pct: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            validated_pct: 5.0,
            averaged_pct: 10.0,
        }
    }
}

/// Secondary providers per period kind, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FallbackConfig {
    pub annual: Vec<ProviderId>,
    pub quarterly: Vec<ProviderId>,
}

impl FallbackConfig {
    pub fn for_kind(&self, kind: PeriodKind) -> &[ProviderId] {
        match kind {
            PeriodKind::Annual => &self.annual,
            PeriodKind::Quarterly => &self.quarterly,
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            annual: vec![
                ProviderId::Yahoo,
                ProviderId::Alphavantage,
                ProviderId::FinnhubAsReported,
                ProviderId::Fmp,
            ],
            quarterly: vec![
                ProviderId::Yahoo,
                ProviderId::Finnhub,
                ProviderId::FinnhubAsReported,
            ],
        }
    }
}

/// Per-provider overrides of the built-in [`ProviderPolicy`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderPolicyConfig {
    pub quota_window_secs: Option<f64>,
    pub quota_limit: Option<u32>,
    pub max_wait_secs: Option<f64>,
    pub max_concurrency: Option<usize>,
}

impl ProviderPolicyConfig {
    pub fn apply(&self, provider: ProviderId) -> ProviderPolicy {
        let mut policy = ProviderPolicy::default_for(provider);
        if let Some(seconds) = self.quota_window_secs {
            policy.quota_window = Duration::from_secs_f64(seconds);
        }
        if let Some(limit) = self.quota_limit {
            policy.quota_limit = limit;
        }
        if let Some(seconds) = self.max_wait_secs {
            policy.max_wait = Duration::from_secs_f64(seconds);
        }
        if let Some(concurrency) = self.max_concurrency {
            policy.max_concurrency = concurrency;
        }
        policy
    }
}

impl EngineConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = if input.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(input)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Effective policy for every provider, overrides applied.
    pub fn provider_policies(&self) -> Vec<ProviderPolicy> {
        ProviderId::ALL
            .into_iter()
            .map(|provider| match self.providers.get(&provider) {
                Some(overrides) => overrides.apply(provider),
                None => ProviderPolicy::default_for(provider),
            })
            .collect()
    }

    pub fn lookback(&self, kind: PeriodKind) -> usize {
        let periods = match kind {
            PeriodKind::Annual => self.years_to_fetch,
            PeriodKind::Quarterly => self.quarters_to_fetch,
        };
        periods as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.years_to_fetch == 0 {
            return Err(invalid("years_to_fetch", "must be at least 1"));
        }
        if self.quarters_to_fetch == 0 {
            return Err(invalid("quarters_to_fetch", "must be at least 1"));
        }
        if self.concepts.revenue.is_empty() {
            return Err(invalid("concepts.revenue", "must list at least one concept"));
        }
        if self.concepts.eps_diluted.is_empty() {
            return Err(invalid(
                "concepts.eps_diluted",
                "must list at least one concept",
            ));
        }
        if self.annual_forms.iter().all(|form| form.trim().is_empty()) {
            return Err(invalid("annual_forms", "must list at least one form type"));
        }

        let classifier = self.classifier;
        if classifier.min_annual_days <= 0 {
            return Err(invalid("classifier.min_annual_days", "must be positive"));
        }
        if classifier.quarter_min_days <= 0 || classifier.quarter_min_days > classifier.quarter_max_days
        {
            return Err(invalid(
                "classifier.quarter_min_days",
                "must be positive and not exceed quarter_max_days",
            ));
        }

        let tolerance = self.tolerance;
        let ordered = tolerance.validated_pct.is_finite()
            && tolerance.averaged_pct.is_finite()
            && 0.0 <= tolerance.validated_pct
            && tolerance.validated_pct <= tolerance.averaged_pct;
        if !ordered {
            return Err(invalid(
                "tolerance",
                "thresholds must satisfy 0 <= validated_pct <= averaged_pct",
            ));
        }

        if self.max_quarter_gap_days <= 0 {
            return Err(invalid("max_quarter_gap_days", "must be positive"));
        }
        if self.max_concurrent_entities == 0 {
            return Err(invalid("max_concurrent_entities", "must be at least 1"));
        }
        if let Some(provider) = self
            .fallback
            .annual
            .iter()
            .chain(&self.fallback.quarterly)
            .find(|provider| provider.is_primary())
        {
            return Err(invalid(
                "fallback",
                format!("'{provider}' is the primary source and cannot be a fallback"),
            ));
        }

        for (provider, overrides) in &self.providers {
            let bad_secs = |value: Option<f64>| value.is_some_and(|s| !s.is_finite() || s < 0.0);
            if bad_secs(overrides.quota_window_secs) || bad_secs(overrides.max_wait_secs) {
                return Err(invalid(
                    "providers",
                    format!("'{provider}' durations must be finite and non-negative"),
                ));
            }
            if overrides.quota_limit == Some(0) || overrides.max_concurrency == Some(0) {
                return Err(invalid(
                    "providers",
                    format!("'{provider}' quota_limit and max_concurrency must be at least 1"),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_yaml_str("").expect("defaults are valid");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.lookback(PeriodKind::Annual), 6);
        assert_eq!(config.lookback(PeriodKind::Quarterly), 8);
        assert_eq!(config.fallback.annual[0], ProviderId::Yahoo);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = EngineConfig::from_yaml_str(
            "years_to_fetch: 4\ntolerance:\n  averaged_pct: 12.5\nfallback:\n  quarterly: [finnhub]\n",
        )
        .expect("valid config");

        assert_eq!(config.years_to_fetch, 4);
        assert_eq!(config.quarters_to_fetch, 8);
        assert_eq!(config.tolerance.validated_pct, 5.0);
        assert_eq!(config.tolerance.averaged_pct, 12.5);
        assert_eq!(config.fallback.quarterly, vec![ProviderId::Finnhub]);
        assert_eq!(config.fallback.annual, FallbackConfig::default().annual);
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let err = EngineConfig::from_yaml_str("tolerance:\n  validated_pct: 11\n  averaged_pct: 10\n")
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::Invalid { field: "tolerance", .. }));
    }

    #[test]
    fn rejects_zero_lookback() {
        let err = EngineConfig::from_yaml_str("quarters_to_fetch: 0\n").expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "quarters_to_fetch",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = EngineConfig::from_yaml_str("year_to_fetch: 3\n").expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_fallback_chain_disables_fallback() {
        let config = EngineConfig::from_yaml_str("fallback:\n  annual: []\n  quarterly: []\n")
            .expect("empty chains are allowed");
        assert!(config.fallback.for_kind(PeriodKind::Annual).is_empty());
    }

    #[test]
    fn provider_overrides_merge_with_defaults() {
        let config = EngineConfig::from_yaml_str(
            "providers:\n  alphavantage:\n    quota_limit: 75\n    max_wait_secs: 2.5\n",
        )
        .expect("valid config");

        let policy = config
            .provider_policies()
            .into_iter()
            .find(|policy| policy.provider_id == ProviderId::Alphavantage)
            .expect("policy present");
        assert_eq!(policy.quota_limit, 75);
        assert_eq!(policy.max_wait, Duration::from_millis(2500));
        assert_eq!(policy.quota_window, Duration::from_secs(60));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "max_concurrent_entities: 2").expect("write config");

        let config = EngineConfig::from_path(file.path()).expect("valid config");
        assert_eq!(config.max_concurrent_entities, 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = EngineConfig::from_path(Path::new("/nonexistent/growthline.yaml"))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
