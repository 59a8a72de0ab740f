//! # Domain Models
//!
//! Validated value types shared by the provider contract, the reconciliation
//! engine and the output records.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Normalized ticker symbol |
//! | [`FilerId`] | Ten digit primary-source filer id |
//! | [`Entity`] | Company tracked by a run |
//! | [`FiscalDate`] | Period boundary date (`YYYY-MM-DD`) |
//! | [`UtcDateTime`] | Extraction and run timestamps |
//! | [`FilingFact`] | Raw primary-source fact |
//! | [`Observation`] | Provider-reported value for one period |

mod fiscal_date;
mod models;
mod symbol;
mod timestamp;

pub use fiscal_date::FiscalDate;
pub use models::{
    CompanyFacts, Entity, FilingFact, Metric, Observation, ObservationSet, PeriodKind,
};
pub use symbol::{FilerId, Symbol};
pub use timestamp::UtcDateTime;
