use crate::error::ConfigError;
use crate::log_format::CompiledFormat;
use crate::record::OutputFields;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_LOG_FORMAT: &str = "<date> <time> <message>";
const DEFAULT_CONTENT_FIELD: &str = "message";
const DEFAULT_THRESHOLD: f64 = 0.5;
const DEFAULT_GRAM_DICT_SIZE: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Line layout with `<name>` placeholders, e.g. "<date> <time> <message>"
    pub log_format: String,
    /// Placeholder whose value is mined for templates
    pub content_field: String,
    /// Extra masking patterns, applied in order before the built-ins
    pub user_patterns: Vec<String>,
    /// Ratio at or below which a position is dynamic, in [0, 1]
    pub dynamic_token_threshold: f64,
    /// Capacity of each of the three gram tables
    pub maximum_gram_dict_size: usize,

    // Seeding (optional)
    pub seed_file: Option<PathBuf>,
    /// Fraction of the seed file's lines to ingest, from the top
    pub seed_ratio: f64,

    // Stream partitioning
    pub partitions: usize,
    /// Header field that routes a line to its partition
    pub partition_field: Option<String>,

    pub output_fields: OutputFields,

    /// Log file read by the binary; stdin when unset
    pub input_file: Option<PathBuf>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            content_field: DEFAULT_CONTENT_FIELD.to_string(),
            user_patterns: Vec::new(),
            dynamic_token_threshold: DEFAULT_THRESHOLD,
            maximum_gram_dict_size: DEFAULT_GRAM_DICT_SIZE,
            seed_file: None,
            seed_ratio: 1.0,
            partitions: 1,
            partition_field: None,
            output_fields: OutputFields::default(),
            input_file: None,
        }
    }
}

impl MinerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_format(mut self, format: impl Into<String>) -> Self {
        self.log_format = format.into();
        self
    }

    pub fn with_content_field(mut self, field: impl Into<String>) -> Self {
        self.content_field = field.into();
        self
    }

    pub fn with_user_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.dynamic_token_threshold = threshold;
        self
    }

    pub fn with_gram_dict_size(mut self, size: usize) -> Self {
        self.maximum_gram_dict_size = size;
        self
    }

    pub fn with_seed_file(mut self, path: impl Into<PathBuf>, ratio: f64) -> Self {
        self.seed_file = Some(path.into());
        self.seed_ratio = ratio;
        self
    }

    pub fn with_partitions(mut self, partitions: usize, field: Option<&str>) -> Self {
        self.partitions = partitions;
        self.partition_field = field.map(str::to_string);
        self
    }

    pub fn with_output_fields(mut self, fields: OutputFields) -> Self {
        self.output_fields = fields;
        self
    }

    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    /// Check every setting and return the compiled log format.
    pub fn validate(&self) -> Result<CompiledFormat, ConfigError> {
        let format = CompiledFormat::compile(&self.log_format)?;

        if !format.has_field(&self.content_field) {
            return Err(ConfigError::UnknownContentField(self.content_field.clone()));
        }
        if let Some(field) = &self.partition_field {
            if !format.has_field(field) {
                return Err(ConfigError::UnknownPartitionField(field.clone()));
            }
        }
        if !(0.0..=1.0).contains(&self.dynamic_token_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.dynamic_token_threshold));
        }
        if self.maximum_gram_dict_size == 0 {
            return Err(ConfigError::ZeroGramDictSize);
        }
        if self.partitions == 0 {
            return Err(ConfigError::ZeroPartitions);
        }
        if !(self.seed_ratio > 0.0 && self.seed_ratio <= 1.0) {
            return Err(ConfigError::SeedRatioOutOfRange(self.seed_ratio));
        }

        Ok(format)
    }

    /// Load from a JSON file; missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::from_io(path, e))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::parse_error(path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `LOGMINER_*` environment variables; unset ones take their
    /// defaults. `LOGMINER_USER_PATTERNS` is a JSON array of strings.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            log_format: env::var("LOGMINER_LOG_FORMAT").unwrap_or(defaults.log_format),
            content_field: env::var("LOGMINER_CONTENT_FIELD").unwrap_or(defaults.content_field),
            user_patterns: match env::var("LOGMINER_USER_PATTERNS") {
                Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                    ConfigError::invalid_env("LOGMINER_USER_PATTERNS", e.to_string())
                })?,
                Err(_) => defaults.user_patterns,
            },
            dynamic_token_threshold: parse_var("LOGMINER_THRESHOLD")?
                .unwrap_or(defaults.dynamic_token_threshold),
            maximum_gram_dict_size: parse_var("LOGMINER_MAX_GRAM_DICT_SIZE")?
                .unwrap_or(defaults.maximum_gram_dict_size),
            seed_file: env::var("LOGMINER_SEED_FILE").ok().map(PathBuf::from),
            seed_ratio: parse_var("LOGMINER_SEED_RATIO")?.unwrap_or(defaults.seed_ratio),
            partitions: parse_var("LOGMINER_PARTITIONS")?.unwrap_or(defaults.partitions),
            partition_field: env::var("LOGMINER_PARTITION_FIELD").ok(),
            output_fields: defaults.output_fields,
            input_file: env::var("LOGMINER_INPUT").ok().map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn log_config(&self) {
        tracing::info!("📋 Miner configuration:");
        tracing::info!("   Log format: {}", self.log_format);
        tracing::info!("   Content field: {}", self.content_field);
        tracing::info!("   User patterns: {}", self.user_patterns.len());
        tracing::info!("   Dynamic token threshold: {}", self.dynamic_token_threshold);
        tracing::info!("   Max gram dict size: {}", self.maximum_gram_dict_size);
        if let Some(ref seed) = self.seed_file {
            tracing::info!("   Seed file: {} (ratio {})", seed.display(), self.seed_ratio);
        }
        match self.input_file {
            Some(ref input) => tracing::info!("   Input: {}", input.display()),
            None => tracing::info!("   Input: stdin"),
        }
        tracing::info!("   Partitions: {}", self.partitions);
        if let Some(ref field) = self.partition_field {
            tracing::info!("   Partition field: {}", field);
        }
    }
}

fn parse_var<T>(var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::invalid_env(var, e.to_string())),
        Err(_) => Ok(None),
    }
}
