//! Growth metrics derived from finalized series.
//!
//! All figures are decimal ratios (`0.05` is five percent). The free functions
//! compute exact values; [`GrowthRecord`] rounds them to four decimals for output.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::recon::{Series, ValidationStatus};
use crate::{FiscalDate, Metric, PeriodKind};

pub const DAYS_PER_YEAR: f64 = 365.25;
/// Slack allowed when looking for the entry a whole number of years earlier.
pub const YEAR_MATCH_TOLERANCE_DAYS: f64 = 20.0;
pub const TTM_QUARTERS: usize = 8;
const OUTPUT_DECIMALS: i32 = 4;

/// `(current - prior) / |prior|`; `None` when the prior value is zero.
pub fn growth_rate(current: f64, prior: f64) -> Option<f64> {
    if prior == 0.0 {
        return None;
    }
    Some((current - prior) / prior.abs())
}

/// Compound annual growth over `years`. Falls back to the linear annualized
/// rate `(end - start) / |start| / years` when either endpoint is not positive.
pub fn cagr(start: f64, end: f64, years: u32) -> Option<f64> {
    if years == 0 {
        return None;
    }
    let years = f64::from(years);
    if start > 0.0 && end > 0.0 {
        return Some((end / start).powf(1.0 / years) - 1.0);
    }
    if start != 0.0 {
        return Some((end - start) / start.abs() / years);
    }
    None
}

/// Index of the entry before `index` whose period end lies `years` years
/// earlier, within [`YEAR_MATCH_TOLERANCE_DAYS`]. Nearest wins.
pub fn years_before(points: &[(FiscalDate, Option<f64>)], index: usize, years: u32) -> Option<usize> {
    let (end, _) = points.get(index)?;
    let target = DAYS_PER_YEAR * f64::from(years);
    points[..index]
        .iter()
        .enumerate()
        .map(|(candidate, (start, _))| (candidate, (end.days_since(*start) as f64 - target).abs()))
        .filter(|(_, distance)| *distance <= YEAR_MATCH_TOLERANCE_DAYS)
        .min_by(|left, right| left.1.total_cmp(&right.1))
        .map(|(candidate, _)| candidate)
}

/// Year-over-year change for every entry but the oldest, oldest first.
/// Entries without a prior-year entry, or with a missing or zero value, map to `None`.
pub fn yoy(points: &[(FiscalDate, Option<f64>)]) -> Vec<(FiscalDate, Option<f64>)> {
    (1..points.len())
        .map(|index| {
            let (end, current) = points[index];
            let change = years_before(points, index, 1).and_then(|prior| {
                let prior = points[prior].1?;
                growth_rate(current?, prior)
            });
            (end, change)
        })
        .collect()
}

/// CAGR from the entry `years` before the latest one to the latest one.
pub fn cagr_over(points: &[(FiscalDate, Option<f64>)], years: u32) -> Option<f64> {
    let latest = points.len().checked_sub(1)?;
    let start = years_before(points, latest, years)?;
    cagr(points[start].1?, points[latest].1?, years)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TtmFigures {
    pub value: Option<f64>,
    pub yoy: Option<f64>,
}

/// Trailing-twelve-month sum of the latest four quarters and its change against
/// the four before. Needs [`TTM_QUARTERS`] contiguous quarters, all with values.
pub fn ttm(points: &[(FiscalDate, Option<f64>)], max_gap_days: i64) -> TtmFigures {
    let Some(window) = points.len().checked_sub(TTM_QUARTERS).map(|skip| &points[skip..]) else {
        return TtmFigures::default();
    };

    let contiguous = window
        .windows(2)
        .all(|pair| pair[1].0.days_since(pair[0].0) <= max_gap_days);
    let values = window.iter().map(|(_, value)| *value).collect::<Option<Vec<_>>>();
    let (true, Some(values)) = (contiguous, values) else {
        return TtmFigures::default();
    };

    let prior = values[..4].iter().sum::<f64>();
    let current = values[4..].iter().sum::<f64>();
    TtmFigures {
        value: Some(current),
        yoy: growth_rate(current, prior),
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn round_output(value: Option<f64>) -> Option<f64> {
    value.map(|value| round_to(value, OUTPUT_DECIMALS))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtmSource {
    /// Every quarter in the latest four came from the primary source.
    Primary,
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtmSnapshot {
    pub as_of_quarter: Option<FiscalDate>,
    pub revenue: Option<f64>,
    pub revenue_yoy: Option<f64>,
    pub eps: Option<f64>,
    pub eps_yoy: Option<f64>,
    pub source: Option<TtmSource>,
}

/// Growth figures for one entity. Computed once from finalized series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    /// Keyed by fiscal year (`"2022"`), or by end date when two fiscal years
    /// end in the same calendar year.
    pub revenue_yoy: BTreeMap<String, Option<f64>>,
    pub eps_yoy: BTreeMap<String, Option<f64>>,
    /// Keyed by quarter end date.
    pub quarterly_revenue_yoy: BTreeMap<String, Option<f64>>,
    pub quarterly_eps_yoy: BTreeMap<String, Option<f64>>,
    pub ttm: TtmSnapshot,
    pub revenue_cagr_3yr: Option<f64>,
    pub revenue_cagr_5yr: Option<f64>,
    pub eps_cagr_3yr: Option<f64>,
    pub eps_cagr_5yr: Option<f64>,
}

impl GrowthRecord {
    pub fn compute(annual: &Series, quarterly: &Series, max_quarter_gap_days: i64) -> Self {
        let annual_revenue = annual.values(Metric::Revenue);
        let annual_eps = annual.values(Metric::EpsDiluted);

        Self {
            revenue_yoy: yoy_map(PeriodKind::Annual, &annual_revenue),
            eps_yoy: yoy_map(PeriodKind::Annual, &annual_eps),
            quarterly_revenue_yoy: yoy_map(PeriodKind::Quarterly, &quarterly.values(Metric::Revenue)),
            quarterly_eps_yoy: yoy_map(PeriodKind::Quarterly, &quarterly.values(Metric::EpsDiluted)),
            ttm: ttm_snapshot(quarterly, max_quarter_gap_days),
            revenue_cagr_3yr: round_output(cagr_over(&annual_revenue, 3)),
            revenue_cagr_5yr: round_output(cagr_over(&annual_revenue, 5)),
            eps_cagr_3yr: round_output(cagr_over(&annual_eps, 3)),
            eps_cagr_5yr: round_output(cagr_over(&annual_eps, 5)),
        }
    }
}

/// Annual changes are keyed by fiscal year, except where two fiscal years end
/// in the same calendar year (52/53-week filers); those keep their full end date.
fn yoy_map(kind: PeriodKind, points: &[(FiscalDate, Option<f64>)]) -> BTreeMap<String, Option<f64>> {
    let changes = yoy(points);
    let mut ends_per_year: HashMap<i32, usize> = HashMap::new();
    for (end, _) in &changes {
        *ends_per_year.entry(end.year()).or_default() += 1;
    }

    changes
        .into_iter()
        .map(|(end, change)| {
            let key = match kind {
                PeriodKind::Annual if ends_per_year.get(&end.year()).copied().unwrap_or(0) > 1 => {
                    warn!(period_end = %end, "two fiscal years end in one calendar year");
                    end.to_string()
                }
                PeriodKind::Annual => end.year().to_string(),
                PeriodKind::Quarterly => end.to_string(),
            };
            (key, round_output(change))
        })
        .collect()
}

fn ttm_snapshot(quarterly: &Series, max_gap_days: i64) -> TtmSnapshot {
    let revenue = ttm(&quarterly.values(Metric::Revenue), max_gap_days);
    let eps = ttm(&quarterly.values(Metric::EpsDiluted), max_gap_days);

    let used = [(Metric::Revenue, revenue), (Metric::EpsDiluted, eps)]
        .into_iter()
        .filter(|(_, figures)| figures.value.is_some())
        .map(|(metric, _)| metric)
        .collect::<Vec<_>>();
    let source = (!used.is_empty()).then(|| {
        let all_primary = quarterly.iter().rev().take(4).all(|entry| {
            used.iter().all(|metric| {
                entry
                    .cell(*metric)
                    .is_some_and(|cell| cell.status == ValidationStatus::PrimarySource)
            })
        });
        if all_primary {
            TtmSource::Primary
        } else {
            TtmSource::Mixed
        }
    });

    TtmSnapshot {
        as_of_quarter: quarterly.latest().map(|entry| entry.period_end()),
        revenue: round_output(revenue.value),
        revenue_yoy: round_output(revenue.yoy),
        eps: round_output(eps.value),
        eps_yoy: round_output(eps.yoy),
        source,
    }
}
