// Core mining pipeline
pub mod gram_engine;
pub mod log_format;
pub mod masker;
pub mod template_miner;
pub mod template_registry;

pub mod config;
pub mod error;
pub mod histogram;
pub mod partition;
pub mod pipeline;
pub mod record;
pub mod template_export;

pub use config::MinerConfig;
pub use error::ConfigError;
pub use partition::PartitionedMiner;
pub use pipeline::{LineOutcome, LogMiner, MinedLine, MinerStats, SkipReason};
