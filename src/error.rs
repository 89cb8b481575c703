use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems. Raised while building a miner, never per line.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("log format `{0}` contains no <placeholder> fields")]
    NoPlaceholders(String),
    #[error("placeholder <{0}> appears more than once in the log format")]
    DuplicatePlaceholder(String),
    #[error("placeholder <{0}> is not a valid field name (letters, digits and `_` only)")]
    InvalidPlaceholderName(String),
    #[error("content field `{0}` is not a placeholder of the log format")]
    UnknownContentField(String),
    #[error("partition field `{0}` is not a placeholder of the log format")]
    UnknownPartitionField(String),
    #[error("failed to compile log format into a line pattern")]
    InvalidFormat(#[source] regex::Error),
    #[error("invalid user pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("dynamic token threshold {0} must lie in [0, 1]")]
    ThresholdOutOfRange(f64),
    #[error("maximum gram dictionary size must be positive")]
    ZeroGramDictSize,
    #[error("partition count must be positive")]
    ZeroPartitions,
    #[error("seed ratio {0} must lie in (0, 1]")]
    SeedRatioOutOfRange(f64),
    #[error("invalid value for {var}: {message}")]
    InvalidEnv { var: String, message: String },
    #[error("failed to read configuration from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration from {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub fn invalid_env(var: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidEnv {
            var: var.to_string(),
            message: message.into(),
        }
    }

    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Read {
            path: path.into().display().to_string(),
            source,
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ConfigError::Parse {
            path: path.into().display().to_string(),
            source,
        }
    }
}
