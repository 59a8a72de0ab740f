use growthline_core::{ConfigError, CoreError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load snapshot '{path}': {source}")]
    Snapshot {
        path: String,
        #[source]
        source: CoreError,
    },

    #[error("strict mode failed: issues={issue_count}, abandoned={abandoned}")]
    StrictModeViolation { issue_count: usize, abandoned: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 7,
            Self::Snapshot { source, .. } => match source {
                CoreError::Validation(_) => 2,
                CoreError::Config(_) => 7,
                CoreError::Serialization(_) => 4,
            },
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let validation = CliError::from(ValidationError::EmptySymbol);
        assert_eq!(validation.exit_code(), 2);

        let config = CliError::from(ConfigError::Invalid {
            field: "years_to_fetch",
            reason: String::from("must be at least 1"),
        });
        assert_eq!(config.exit_code(), 7);

        let malformed = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        let snapshot = CliError::Snapshot {
            path: String::from("snapshot.json"),
            source: CoreError::from(malformed),
        };
        assert_eq!(snapshot.exit_code(), 4);

        let strict = CliError::StrictModeViolation {
            issue_count: 2,
            abandoned: 0,
        };
        assert_eq!(strict.exit_code(), 5);

        let io = CliError::from(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 10);
    }
}
