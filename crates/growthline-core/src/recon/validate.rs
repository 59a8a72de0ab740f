use crate::config::ToleranceConfig;
use crate::recon::series::ValidationStatus;
use crate::ProviderId;

/// Cross-validated value for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub value: f64,
    pub status: ValidationStatus,
    /// Reporting providers, highest priority first.
    pub sources: Vec<ProviderId>,
    /// Spread between reports, rounded to two decimals. `None` for a single report.
    pub discrepancy_pct: Option<f64>,
}

/// Compares values reported by several providers for the same cell.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidator {
    tolerance: ToleranceConfig,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(ToleranceConfig::default())
    }
}

impl CrossValidator {
    pub fn new(tolerance: ToleranceConfig) -> Self {
        Self { tolerance }
    }

    /// `reports` must be in provider priority order. Returns `None` when nobody reported.
    pub fn reconcile(&self, reports: &[(ProviderId, f64)]) -> Option<Reconciled> {
        let sources = reports.iter().map(|(provider, _)| *provider).collect();
        match reports {
            [] => None,
            [(_, value)] => Some(Reconciled {
                value: *value,
                status: ValidationStatus::SingleSource,
                sources,
                discrepancy_pct: None,
            }),
            [(_, first), ..] => {
                let values = reports.iter().map(|(_, value)| *value).collect::<Vec<_>>();
                let pct = discrepancy_pct(&values);
                let (status, value) = if pct <= self.tolerance.validated_pct {
                    (ValidationStatus::Validated, *first)
                } else if pct <= self.tolerance.averaged_pct {
                    (ValidationStatus::Averaged, mean(&values))
                } else {
                    (ValidationStatus::Discrepancy, mean(&values))
                };
                Some(Reconciled {
                    value,
                    status,
                    sources,
                    discrepancy_pct: Some(round_pct(pct)),
                })
            }
        }
    }
}

/// `(max - min) * 100 / denom`, where `denom` is the largest absolute value.
/// All-zero input has no spread.
pub fn discrepancy_pct(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let denom = values.iter().map(|value| value.abs()).fold(0.0, f64::max);
    if values.is_empty() || denom == 0.0 {
        return 0.0;
    }
    (max - min) * 100.0 / denom
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn round_pct(pct: f64) -> f64 {
    (pct * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reports(values: &[f64]) -> Vec<(ProviderId, f64)> {
        let providers = [ProviderId::Yahoo, ProviderId::Alphavantage, ProviderId::Fmp];
        providers.iter().copied().zip(values.iter().copied()).collect()
    }

    #[test]
    fn close_reports_validate_to_highest_priority_value() {
        let reconciled = CrossValidator::default()
            .reconcile(&reports(&[100.0, 104.0]))
            .expect("two reports");

        assert_eq!(reconciled.status, ValidationStatus::Validated);
        assert_eq!(reconciled.value, 100.0);
        assert_eq!(reconciled.discrepancy_pct, Some(3.85));
        assert_eq!(
            reconciled.sources,
            vec![ProviderId::Yahoo, ProviderId::Alphavantage]
        );
    }

    #[test]
    fn moderate_spread_is_averaged() {
        let reconciled = CrossValidator::default()
            .reconcile(&reports(&[100.0, 108.0]))
            .expect("two reports");

        assert_eq!(reconciled.status, ValidationStatus::Averaged);
        assert_eq!(reconciled.value, 104.0);
        assert_eq!(reconciled.discrepancy_pct, Some(7.41));
    }

    #[test]
    fn wide_spread_is_flagged() {
        let reconciled = CrossValidator::default()
            .reconcile(&reports(&[100.0, 125.0]))
            .expect("two reports");

        assert_eq!(reconciled.status, ValidationStatus::Discrepancy);
        assert_eq!(reconciled.value, 112.5);
        assert_eq!(reconciled.discrepancy_pct, Some(20.0));
    }

    #[test]
    fn thresholds_are_inclusive() {
        let validator = CrossValidator::default();
        let at_five = validator.reconcile(&reports(&[95.0, 100.0])).expect("reports");
        assert_eq!(at_five.status, ValidationStatus::Validated);

        let at_ten = validator.reconcile(&reports(&[90.0, 100.0])).expect("reports");
        assert_eq!(at_ten.status, ValidationStatus::Averaged);
    }

    #[test]
    fn single_and_missing_reports() {
        let validator = CrossValidator::default();
        assert!(validator.reconcile(&[]).is_none());

        let single = validator.reconcile(&reports(&[42.0])).expect("one report");
        assert_eq!(single.status, ValidationStatus::SingleSource);
        assert_eq!(single.discrepancy_pct, None);
    }

    #[test]
    fn zero_and_negative_values() {
        let validator = CrossValidator::default();
        let zeros = validator.reconcile(&reports(&[0.0, 0.0])).expect("reports");
        assert_eq!(zeros.status, ValidationStatus::Validated);
        assert_eq!(zeros.discrepancy_pct, Some(0.0));

        let mixed = validator.reconcile(&reports(&[-2.0, 0.0])).expect("reports");
        assert_eq!(mixed.status, ValidationStatus::Discrepancy);
        assert_eq!(mixed.discrepancy_pct, Some(100.0));
        assert_eq!(mixed.value, -1.0);

        let losses = validator.reconcile(&reports(&[-1.00, -1.02])).expect("reports");
        assert_eq!(losses.status, ValidationStatus::Validated);
        assert_eq!(losses.value, -1.00);
    }
}
