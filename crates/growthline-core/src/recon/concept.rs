use std::collections::HashMap;

use crate::{FilingFact, FiscalDate};

/// Label chosen for a metric, with the period end that won it the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptChoice {
    pub label: String,
    pub latest_end: FiscalDate,
}

/// Picks the concept label with the freshest data among configured candidates.
///
/// Filers switch concepts over time, so the first listed label often carries
/// only stale periods. Selection runs in two passes: every candidate is scored
/// by its latest non-null period end, then the highest score wins. Ties go to
/// the label listed earlier.
#[derive(Debug, Clone, Copy)]
pub struct ConceptSelector<'a> {
    priority: &'a [String],
}

impl<'a> ConceptSelector<'a> {
    pub fn new(priority: &'a [String]) -> Self {
        Self { priority }
    }

    /// Position of `concept` in the priority list. A taxonomy prefix
    /// (`us-gaap:Revenues`) is ignored and comparison is case-insensitive.
    pub fn rank(&self, concept: &str) -> Option<usize> {
        let bare = concept.rsplit(':').next().unwrap_or(concept).trim();
        self.priority
            .iter()
            .position(|label| label.trim().eq_ignore_ascii_case(bare))
    }

    pub fn select(&self, candidates: &HashMap<usize, Vec<&FilingFact>>) -> Option<ConceptChoice> {
        let scored = (0..self.priority.len())
            .filter_map(|rank| {
                let latest_end = candidates
                    .get(&rank)?
                    .iter()
                    .filter(|fact| fact.value.is_some())
                    .map(|fact| fact.end)
                    .max()?;
                Some((rank, latest_end))
            })
            .collect::<Vec<_>>();

        let mut best: Option<(usize, FiscalDate)> = None;
        for (rank, latest_end) in scored {
            if best.map_or(true, |(_, current)| latest_end > current) {
                best = Some((rank, latest_end));
            }
        }

        best.map(|(rank, latest_end)| ConceptChoice {
            label: self.priority[rank].clone(),
            latest_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(concept: &str, end: &str, value: Option<f64>) -> FilingFact {
        FilingFact {
            concept: concept.to_owned(),
            unit: String::from("USD"),
            form: String::from("10-K"),
            fiscal_period: Some(String::from("FY")),
            start: None,
            end: FiscalDate::parse(end).expect("valid"),
            value,
            filed: None,
        }
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn group<'f>(
        selector: &ConceptSelector<'_>,
        facts: &'f [FilingFact],
    ) -> HashMap<usize, Vec<&'f FilingFact>> {
        let mut grouped: HashMap<usize, Vec<&FilingFact>> = HashMap::new();
        for fact in facts {
            if let Some(rank) = selector.rank(&fact.concept) {
                grouped.entry(rank).or_default().push(fact);
            }
        }
        grouped
    }

    #[test]
    fn prefers_most_recent_even_when_listed_later() {
        let priority = labels(&[
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "Revenues",
        ]);
        let selector = ConceptSelector::new(&priority);
        let facts = vec![
            fact("RevenueFromContractWithCustomerExcludingAssessedTax", "2019-12-31", Some(10.0)),
            fact("RevenueFromContractWithCustomerExcludingAssessedTax", "2020-12-31", Some(11.0)),
            fact("Revenues", "2023-12-31", Some(14.0)),
        ];

        let choice = selector.select(&group(&selector, &facts)).expect("candidate");
        assert_eq!(choice.label, "Revenues");
        assert_eq!(choice.latest_end.to_string(), "2023-12-31");
    }

    #[test]
    fn ties_go_to_the_earlier_label() {
        let priority = labels(&["EarningsPerShareDiluted", "EarningsPerShareBasicAndDiluted"]);
        let selector = ConceptSelector::new(&priority);
        let facts = vec![
            fact("EarningsPerShareBasicAndDiluted", "2023-12-31", Some(1.0)),
            fact("us-gaap:EarningsPerShareDiluted", "2023-12-31", Some(1.1)),
        ];

        let choice = selector.select(&group(&selector, &facts)).expect("candidate");
        assert_eq!(choice.label, "EarningsPerShareDiluted");
    }

    #[test]
    fn null_only_candidates_are_ignored() {
        let priority = labels(&["Revenues", "SalesRevenueNet"]);
        let selector = ConceptSelector::new(&priority);
        let facts = vec![
            fact("Revenues", "2024-12-31", None),
            fact("SalesRevenueNet", "2022-12-31", Some(5.0)),
        ];

        let choice = selector.select(&group(&selector, &facts)).expect("candidate");
        assert_eq!(choice.label, "SalesRevenueNet");
    }

    #[test]
    fn no_candidates_leaves_metric_unresolved() {
        let priority = labels(&["Revenues"]);
        let selector = ConceptSelector::new(&priority);
        let facts = vec![fact("NetIncomeLoss", "2024-12-31", Some(5.0))];

        assert!(selector.select(&group(&selector, &facts)).is_none());
    }
}
