//! Property tests for growth and cross-validation arithmetic.
//!
//! Uses proptest to verify:
//! 1. CAGR identity: compounding a rate for n years and taking the CAGR returns the rate
//! 2. Linear fallback: a non-positive start or end annualizes the simple change
//! 3. TTM is absent whenever any of the eight quarters is missing
//! 4. Year-over-year is absent without a prior-year value
//! 5. Tolerance boundaries are inclusive and the spread is order-independent

use proptest::prelude::*;

use growthline_core::growth::{cagr, growth_rate, ttm, yoy, TTM_QUARTERS};
use growthline_core::recon::{discrepancy_pct, CrossValidator};
use growthline_core::{FiscalDate, ProviderId, ValidationStatus};

const QUARTER_ENDS: [&str; TTM_QUARTERS] = [
    "2022-03-31",
    "2022-06-30",
    "2022-09-30",
    "2022-12-31",
    "2023-03-31",
    "2023-06-30",
    "2023-09-30",
    "2023-12-31",
];

fn quarters(values: &[Option<f64>]) -> Vec<(FiscalDate, Option<f64>)> {
    QUARTER_ENDS
        .iter()
        .zip(values)
        .map(|(end, value)| (FiscalDate::parse(end).expect("valid date"), *value))
        .collect()
}

// ── Strategies ───────────────────────────────────────────────────────

fn arb_positive() -> impl Strategy<Value = f64> {
    1.0..1.0e9_f64
}

fn arb_rate() -> impl Strategy<Value = f64> {
    -0.5..1.0_f64
}

fn arb_quarter_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..1.0e6_f64, TTM_QUARTERS)
}

// ── 1. CAGR identity ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn cagr_recovers_the_compounded_rate(start in arb_positive(), rate in arb_rate(), years in 1u32..10) {
        let end = start * (1.0 + rate).powi(years as i32);
        let recovered = cagr(start, end, years).expect("positive endpoints");
        prop_assert!((recovered - rate).abs() < 1e-9, "rate {rate} recovered as {recovered}");
    }

    #[test]
    fn cagr_over_zero_years_is_undefined(start in arb_positive(), end in arb_positive()) {
        prop_assert_eq!(cagr(start, end, 0), None);
    }
}

// ── 2. Linear fallback ───────────────────────────────────────────────

proptest! {
    #[test]
    fn negative_start_uses_linear_annualized_change(
        start in -1.0e6..-1.0_f64,
        end in -1.0e6..1.0e6_f64,
        years in 1u32..10,
    ) {
        let expected = (end - start) / start.abs() / f64::from(years);
        let actual = cagr(start, end, years).expect("non-zero start");
        prop_assert!((actual - expected).abs() < 1e-12);
    }

    #[test]
    fn non_positive_end_uses_linear_annualized_change(
        start in 1.0..1.0e6_f64,
        end in -1.0e6..=0.0_f64,
        years in 1u32..10,
    ) {
        let expected = (end - start) / start / f64::from(years);
        let actual = cagr(start, end, years).expect("positive start");
        prop_assert!((actual - expected).abs() < 1e-12);
        prop_assert!(actual < 0.0);
    }
}

#[test]
fn cagr_from_zero_is_undefined() {
    assert_eq!(cagr(0.0, 100.0, 3), None);
}

#[test]
fn loss_narrowing_counts_as_growth() {
    assert_eq!(cagr(-100.0, -50.0, 2), Some(0.25));
    assert_eq!(growth_rate(-50.0, -100.0), Some(0.5));
}

#[test]
fn swing_to_a_loss_is_linear_decline() {
    assert_eq!(cagr(100.0, -50.0, 3), Some(-0.5));
}

// ── 3. TTM needs all eight quarters ──────────────────────────────────

proptest! {
    #[test]
    fn ttm_sums_latest_four_quarters(values in arb_quarter_values()) {
        let points = quarters(&values.iter().copied().map(Some).collect::<Vec<_>>());
        let figures = ttm(&points, 100);

        let current = values[4..].iter().sum::<f64>();
        let prior = values[..4].iter().sum::<f64>();
        prop_assert_eq!(figures.value, Some(current));
        let change = figures.yoy.expect("positive prior");
        prop_assert!((change - (current - prior) / prior).abs() < 1e-9);
    }

    #[test]
    fn ttm_is_absent_when_any_quarter_is_missing(
        values in arb_quarter_values(),
        missing in 0usize..TTM_QUARTERS,
    ) {
        let mut values = values.into_iter().map(Some).collect::<Vec<_>>();
        values[missing] = None;

        let figures = ttm(&quarters(&values), 100);
        prop_assert_eq!(figures.value, None);
        prop_assert_eq!(figures.yoy, None);
    }
}

#[test]
fn ttm_is_absent_when_quarters_are_not_contiguous() {
    let values = vec![Some(10.0); TTM_QUARTERS];
    assert!(ttm(&quarters(&values), 100).value.is_some());
    assert!(ttm(&quarters(&values), 80).value.is_none());
}

// ── 4. Year over year ────────────────────────────────────────────────

fn year_ends(values: &[Option<f64>]) -> Vec<(FiscalDate, Option<f64>)> {
    values
        .iter()
        .enumerate()
        .map(|(offset, value)| {
            let year = 2015 + i32::try_from(offset).expect("small offset");
            (FiscalDate::from_ymd(year, 12, 31).expect("valid date"), *value)
        })
        .collect()
}

proptest! {
    #[test]
    fn yoy_covers_every_year_but_the_oldest(values in prop::collection::vec(arb_positive(), 1..8)) {
        let points = year_ends(&values.iter().copied().map(Some).collect::<Vec<_>>());
        let changes = yoy(&points);

        prop_assert_eq!(changes.len(), points.len() - 1);
        for (index, (end, change)) in changes.iter().enumerate() {
            prop_assert_eq!(*end, points[index + 1].0);
            let expected = values[index + 1] / values[index] - 1.0;
            let tolerance = 1e-9 * expected.abs().max(1.0);
            prop_assert!((change.expect("prior present") - expected).abs() < tolerance);
        }
    }

    #[test]
    fn yoy_is_absent_after_a_missing_year(
        values in prop::collection::vec(arb_positive(), 3..8),
        gap in 0usize..2,
    ) {
        let mut values = values.into_iter().map(Some).collect::<Vec<_>>();
        values[gap] = None;

        let changes = yoy(&year_ends(&values));
        prop_assert_eq!(changes[gap].1, None);
    }
}

#[test]
fn yoy_from_zero_is_absent() {
    let changes = yoy(&year_ends(&[Some(0.0), Some(10.0)]));
    assert_eq!(changes, vec![(FiscalDate::from_ymd(2016, 12, 31).expect("valid"), None)]);
}

// ── 5. Cross-validation thresholds ───────────────────────────────────

#[test]
fn tolerance_boundaries_are_inclusive() {
    let validator = CrossValidator::default();

    let at_validated = validator
        .reconcile(&[(ProviderId::Yahoo, 100.0), (ProviderId::Fmp, 95.0)])
        .expect("two reports");
    assert_eq!(at_validated.status, ValidationStatus::Validated);
    assert_eq!(at_validated.value, 100.0);

    let at_averaged = validator
        .reconcile(&[(ProviderId::Yahoo, 100.0), (ProviderId::Fmp, 90.0)])
        .expect("two reports");
    assert_eq!(at_averaged.status, ValidationStatus::Averaged);
    assert_eq!(at_averaged.value, 95.0);
}

proptest! {
    #[test]
    fn spread_ignores_report_order(values in prop::collection::vec(-1.0e6..1.0e6_f64, 2..5)) {
        let mut reversed = values.clone();
        reversed.reverse();
        prop_assert_eq!(discrepancy_pct(&values), discrepancy_pct(&reversed));
    }

    #[test]
    fn spread_is_bounded_and_scale_free(
        values in prop::collection::vec(arb_positive(), 2..5),
        scale in 1.0..1000.0_f64,
    ) {
        let pct = discrepancy_pct(&values);
        prop_assert!((0.0..100.0).contains(&pct));

        let scaled = values.iter().map(|value| value * scale).collect::<Vec<_>>();
        prop_assert!((discrepancy_pct(&scaled) - pct).abs() < 1e-6);
    }

    #[test]
    fn single_report_is_single_source(value in -1.0e6..1.0e6_f64) {
        let reconciled = CrossValidator::default()
            .reconcile(&[(ProviderId::Yahoo, value)])
            .expect("one report");
        prop_assert_eq!(reconciled.status, ValidationStatus::SingleSource);
        prop_assert_eq!(reconciled.value, value);
        prop_assert_eq!(reconciled.discrepancy_pct, None);
    }
}
