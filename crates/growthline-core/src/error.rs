use thiserror::Error;

/// Validation and contract errors exposed by `growthline-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("filer id must be 1-10 ASCII digits: '{value}'")]
    InvalidFilerId { value: String },

    #[error("invalid source '{value}', expected one of sec, yahoo, alphavantage, finnhub, finnhub_as_reported, fmp")]
    InvalidSource { value: String },
    #[error("invalid metric '{value}', expected revenue or eps_diluted")]
    InvalidMetric { value: String },

    #[error("timestamp must be RFC3339 UTC: '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("period range start {start} is after end {end}")]
    InvertedPeriodRange { start: String, end: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config field '{field}' is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
