use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in provenance, priority lists and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Structured regulatory filings; the primary source.
    Sec,
    Yahoo,
    Alphavantage,
    Finnhub,
    FinnhubAsReported,
    Fmp,
}

impl ProviderId {
    pub const ALL: [Self; 6] = [
        Self::Sec,
        Self::Yahoo,
        Self::Alphavantage,
        Self::Finnhub,
        Self::FinnhubAsReported,
        Self::Fmp,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sec => "sec",
            Self::Yahoo => "yahoo",
            Self::Alphavantage => "alphavantage",
            Self::Finnhub => "finnhub",
            Self::FinnhubAsReported => "finnhub_as_reported",
            Self::Fmp => "fmp",
        }
    }

    pub const fn is_primary(self) -> bool {
        matches!(self, Self::Sec)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sec" => Ok(Self::Sec),
            "yahoo" | "yfinance" => Ok(Self::Yahoo),
            "alphavantage" => Ok(Self::Alphavantage),
            "finnhub" => Ok(Self::Finnhub),
            "finnhub_as_reported" => Ok(Self::FinnhubAsReported),
            "fmp" => Ok(Self::Fmp),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
