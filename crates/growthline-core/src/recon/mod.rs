//! Reconciliation of primary filings and secondary provider data into one
//! series per entity and period kind.
//!
//! The pipeline for one entity:
//!
//! 1. [`primary::extract_primary`] classifies filing facts by period length,
//!    keeps the latest filing per period end and selects one concept per metric.
//! 2. [`fallback::FallbackOrchestrator`] queries secondary providers for cells
//!    the primary source left empty, and for whole periods when the series is short.
//! 3. [`validate::CrossValidator`] turns the collected reports for each cell
//!    into a single value with a trust status.

pub mod classify;
pub mod concept;
pub mod fallback;
pub mod issues;
pub mod primary;
pub mod series;
pub mod validate;

pub use classify::{PeriodClass, PeriodClassifier, RejectReason};
pub use concept::{ConceptChoice, ConceptSelector};
pub use fallback::{FallbackOrchestrator, FallbackPlan};
pub use issues::Issue;
pub use primary::{extract_primary, PrimaryExtraction};
pub use series::{PeriodEntry, ResolvedValue, Series, ValidationStatus};
pub use validate::{discrepancy_pct, CrossValidator, Reconciled};
