use std::fmt::{Display, Formatter};

use crate::data_source::SourceError;
use crate::recon::classify::RejectReason;
use crate::{FiscalDate, Metric, PeriodKind, ProviderId};

/// Non-fatal problem recorded on an entity's report.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    ProviderUnavailable {
        provider: ProviderId,
        /// `None` for the primary company-facts call.
        scope: Option<(PeriodKind, Metric)>,
        error: SourceError,
    },
    PeriodRejected {
        metric: Metric,
        period_end: FiscalDate,
        reason: RejectReason,
    },
    CellUnresolvable {
        kind: PeriodKind,
        metric: Metric,
        period_end: FiscalDate,
    },
    EntityNotFound {
        error: SourceError,
    },
}

impl Issue {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "provider.unavailable",
            Self::PeriodRejected { .. } => "period.rejected",
            Self::CellUnresolvable { .. } => "cell.unresolvable",
            Self::EntityNotFound { .. } => "entity.not_found",
        }
    }

    /// True for issues that leave the entity without any usable data.
    pub const fn is_entity_failure(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderUnavailable {
                provider,
                scope: Some((kind, metric)),
                error,
            } => write!(f, "{provider} {kind} {metric}: {error}"),
            Self::ProviderUnavailable {
                provider,
                scope: None,
                error,
            } => write!(f, "{provider} company facts: {error}"),
            Self::PeriodRejected {
                metric,
                period_end,
                reason,
            } => write!(f, "{metric} period ending {period_end} rejected: {reason}"),
            Self::CellUnresolvable {
                kind,
                metric,
                period_end,
            } => write!(
                f,
                "no provider reported {metric} for the {kind} period ending {period_end}"
            ),
            Self::EntityNotFound { error } => {
                write!(f, "primary source has no filings: {}", error.message())
            }
        }
    }
}
