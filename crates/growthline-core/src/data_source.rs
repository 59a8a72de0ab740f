//! Provider adapter contract and request/response types.
//!
//! | Endpoint | Request | Response |
//! |----------|---------|----------|
//! | CompanyFacts | [`Entity`] | [`CompanyFacts`] |
//! | AnnualSeries | [`ObservationRequest`] | [`ObservationSet`] |
//! | QuarterlySeries | [`ObservationRequest`] | [`ObservationSet`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{
    CompanyFacts, Entity, FiscalDate, Metric, ObservationSet, PeriodKind, ProviderId,
    ValidationError,
};

/// Boxed future returned by every [`DataSource`] call.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Data endpoint type used for routing and capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    CompanyFacts,
    AnnualSeries,
    QuarterlySeries,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompanyFacts => "company_facts",
            Self::AnnualSeries => "annual_series",
            Self::QuarterlySeries => "quarterly_series",
        }
    }

    pub const fn for_kind(kind: PeriodKind) -> Self {
        match kind {
            PeriodKind::Annual => Self::AnnualSeries,
            PeriodKind::Quarterly => Self::QuarterlySeries,
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported endpoint matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub company_facts: bool,
    pub annual: bool,
    pub quarterly: bool,
}

impl CapabilitySet {
    pub const fn new(company_facts: bool, annual: bool, quarterly: bool) -> Self {
        Self {
            company_facts,
            annual,
            quarterly,
        }
    }

    /// Secondary providers serve normalized series but no raw filings.
    pub const fn series_only() -> Self {
        Self::new(false, true, true)
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::CompanyFacts => self.company_facts,
            Endpoint::AnnualSeries => self.annual,
            Endpoint::QuarterlySeries => self.quarterly,
        }
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        let mut values = Vec::with_capacity(3);
        if self.company_facts {
            values.push(Endpoint::CompanyFacts.as_str());
        }
        if self.annual {
            values.push(Endpoint::AnnualSeries.as_str());
        }
        if self.quarterly {
            values.push(Endpoint::QuarterlySeries.as_str());
        }
        values
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    RateLimited,
    AuthFailed,
    NotFound,
    Malformed,
    UnsupportedEndpoint,
    AdapterNotRegistered,
}

/// Structured source error. Consumed by the fallback orchestrator, never fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::AuthFailed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedEndpoint,
            message: format!("endpoint '{endpoint}' is not supported by this source"),
            retryable: false,
        }
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::AdapterNotRegistered,
            message: format!("source adapter '{provider}' is not registered"),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::AuthFailed => "source.auth_failed",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::UnsupportedEndpoint => "source.unsupported_endpoint",
            SourceErrorKind::AdapterNotRegistered => "source.adapter_not_registered",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::malformed(error.to_string())
    }
}

/// Inclusive range of period end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodRange {
    start: FiscalDate,
    end: FiscalDate,
}

impl PeriodRange {
    pub fn new(start: FiscalDate, end: FiscalDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedPeriodRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Range ending at `end` and reaching back far enough to cover `years` fiscal years.
    pub fn trailing_years(end: FiscalDate, years: u32) -> Self {
        let years = i32::try_from(years).unwrap_or(i32::MAX / 2);
        Self {
            start: end.years_before(years),
            end,
        }
    }

    pub const fn start(self) -> FiscalDate {
        self.start
    }

    pub const fn end(self) -> FiscalDate {
        self.end
    }

    pub fn contains(self, date: FiscalDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Request payload for the series endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRequest {
    pub entity: Entity,
    pub kind: PeriodKind,
    pub metric: Metric,
    pub range: PeriodRange,
}

impl ObservationRequest {
    pub fn new(entity: Entity, kind: PeriodKind, metric: Metric, range: PeriodRange) -> Self {
        Self {
            entity,
            kind,
            metric,
            range,
        }
    }

    pub const fn endpoint(&self) -> Endpoint {
        Endpoint::for_kind(self.kind)
    }
}

/// Source adapter contract.
///
/// Implementations must be `Send + Sync`: a single adapter instance is shared by
/// every entity worker through the router.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    /// Raw filing facts for one entity. Only the primary source supports this.
    ///
    /// # Errors
    ///
    /// `NotFound` when the entity is unknown to the source.
    fn company_facts<'a>(&'a self, entity: Entity) -> SourceFuture<'a, CompanyFacts>;

    /// Normalized observations for one metric and period kind within `req.range`.
    ///
    /// # Errors
    ///
    /// Any [`SourceErrorKind`]; callers treat every error as "this provider has no data".
    fn observations<'a>(&'a self, req: ObservationRequest) -> SourceFuture<'a, ObservationSet>;
}
