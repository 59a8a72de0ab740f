//! Core contracts for growthline.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - Provider identifiers, the provider adapter contract and call-budget routing
//! - The reconciliation pipeline (period classification, concept selection,
//!   fallback and cross-validation)
//! - Growth metrics, engine configuration and output records

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod engine;
pub mod error;
pub mod growth;
pub mod provider_policy;
pub mod recon;
pub mod report;
pub mod routing;
pub mod source;
pub mod throttling;

pub use adapters::{Snapshot, SnapshotSource};
pub use config::EngineConfig;
pub use data_source::{
    CapabilitySet, DataSource, Endpoint, ObservationRequest, PeriodRange, SourceError,
    SourceErrorKind, SourceFuture,
};
pub use domain::{
    CompanyFacts, Entity, FilerId, FilingFact, FiscalDate, Metric, Observation, ObservationSet,
    PeriodKind, Symbol, UtcDateTime,
};
pub use engine::{Engine, RunOptions, RunOutcome};
pub use error::{ConfigError, CoreError, ValidationError};
pub use growth::{GrowthRecord, TtmSnapshot, TtmSource};
pub use provider_policy::{BackoffPolicy, ProviderPolicy};
pub use recon::{Issue, ResolvedValue, Series, ValidationStatus};
pub use report::{CellRecord, EntityReport, IssueRecord, PeriodRecord, RunMeta, RunReport};
pub use routing::{SourceRouter, SourceSnapshot};
pub use source::ProviderId;
pub use throttling::ThrottlingQueue;
