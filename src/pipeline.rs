//! One stream-processing instance: a compiled format, a masker, and the
//! gram statistics and template registry they feed.
//!
//! A `LogMiner` is single-writer by construction (`&mut self` everywhere).
//! Run one per stream partition; see [`crate::partition`].
use crate::config::MinerConfig;
use crate::error::ConfigError;
use crate::gram_engine::GramEngine;
use crate::histogram::RatioHistogram;
use crate::log_format::CompiledFormat;
use crate::masker::{DynamicTokenMasker, MaskedToken};
use crate::template_miner::TemplateMiner;
use crate::template_registry::TemplateRegistry;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;

/// Why a line produced no template. Expected traffic, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The line does not fit the configured log format
    FormatMismatch,
    /// The content field held no tokens
    EmptyContent,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::FormatMismatch => "format_mismatch",
            SkipReason::EmptyContent => "empty_content",
        }
    }
}

/// Tokens of one line, after masking.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizedLine {
    pub tokens: Vec<String>,
    pub masked_tokens: Vec<MaskedToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinedLine {
    pub template: String,
    pub template_id: u64,
    pub dynamic_tokens: BTreeMap<usize, String>,
    pub masked_tokens: Vec<MaskedToken>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Mined(MinedLine),
    Skipped(SkipReason),
}

impl LineOutcome {
    pub fn mined(&self) -> Option<&MinedLine> {
        match self {
            LineOutcome::Mined(line) => Some(line),
            LineOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, LineOutcome::Skipped(_))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MinerStats {
    pub lines_seen: u64,
    pub lines_mined: u64,
    pub skipped_format_mismatch: u64,
    pub skipped_empty_content: u64,
    pub lines_seeded: u64,
}

impl MinerStats {
    pub fn skipped(&self) -> u64 {
        self.skipped_format_mismatch + self.skipped_empty_content
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::FormatMismatch => self.skipped_format_mismatch += 1,
            SkipReason::EmptyContent => self.skipped_empty_content += 1,
        }
    }
}

/// Outcome of a seeding pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub ingested: u64,
    pub skipped: u64,
}

impl SeedReport {
    pub fn merge(&mut self, other: SeedReport) {
        self.ingested += other.ingested;
        self.skipped += other.skipped;
    }
}

/// The first `ceil(len * ratio)` lines of a seed file, `ratio` in (0, 1].
pub fn read_seed_lines(path: impl AsRef<Path>, ratio: f64) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(ConfigError::SeedRatioOutOfRange(ratio).into());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {}", path.display()))?;

    let lines: Vec<&str> = content.lines().collect();
    let take = (lines.len() as f64 * ratio).ceil() as usize;

    Ok(lines.into_iter().take(take).map(str::to_string).collect())
}

pub struct LogMiner {
    format: CompiledFormat,
    content_field: String,
    masker: DynamicTokenMasker,
    engine: GramEngine,
    miner: TemplateMiner,
    stats: MinerStats,
}

impl LogMiner {
    /// Build an instance from a validated configuration. Does not seed; see
    /// [`LogMiner::from_config`] for that.
    pub fn new(config: &MinerConfig) -> Result<Self, ConfigError> {
        let format = config.validate()?;
        let capacity =
            NonZeroUsize::new(config.maximum_gram_dict_size).ok_or(ConfigError::ZeroGramDictSize)?;

        Ok(Self {
            format,
            content_field: config.content_field.clone(),
            masker: DynamicTokenMasker::new(&config.user_patterns)?,
            engine: GramEngine::new(capacity),
            miner: TemplateMiner::new(config.dynamic_token_threshold)?,
            stats: MinerStats::default(),
        })
    }

    /// Build an instance and, if the configuration names a seed file, warm it.
    pub fn from_config(config: &MinerConfig) -> Result<Self> {
        let mut miner = Self::new(config)?;
        if let Some(path) = &config.seed_file {
            miner.seed_from_file(path, config.seed_ratio)?;
        }
        Ok(miner)
    }

    /// Extract the content field, mask it and split it into tokens.
    pub fn tokenize(&self, line: &str) -> Result<TokenizedLine, SkipReason> {
        let content = self
            .format
            .extract_content(line, &self.content_field)
            .ok_or(SkipReason::FormatMismatch)?;

        let masked = self.masker.mask(content);
        let tokens = masked.tokens();
        if tokens.is_empty() {
            return Err(SkipReason::EmptyContent);
        }

        Ok(TokenizedLine {
            tokens,
            masked_tokens: masked.masked,
        })
    }

    /// Run one line through the whole pipeline. The line's own tokens are
    /// ingested only after it has been classified.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        self.stats.lines_seen += 1;

        let tokenized = match self.tokenize(line) {
            Ok(tokenized) => tokenized,
            Err(reason) => {
                self.stats.record_skip(reason);
                tracing::debug!(reason = reason.as_str(), line, "skipped log line");
                return LineOutcome::Skipped(reason);
            }
        };

        let parsed = self.miner.parse(&mut self.engine, &tokenized.tokens);
        self.engine.ingest(&tokenized.tokens);
        self.stats.lines_mined += 1;

        LineOutcome::Mined(MinedLine {
            template: parsed.template,
            template_id: parsed.template_id,
            dynamic_tokens: parsed.dynamic_tokens,
            masked_tokens: tokenized.masked_tokens,
        })
    }

    /// Warm the statistics from historical lines: extract, mask and ingest
    /// only. Nothing is classified or registered.
    pub fn seed<I, S>(&mut self, lines: I) -> SeedReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = SeedReport::default();

        for line in lines {
            match self.tokenize(line.as_ref()) {
                Ok(tokenized) => {
                    self.engine.ingest(&tokenized.tokens);
                    report.ingested += 1;
                }
                Err(_) => report.skipped += 1,
            }
        }

        self.stats.lines_seeded += report.ingested;
        report
    }

    /// Seed from the first `ratio` share of a file's lines (rounded up).
    pub fn seed_from_file(&mut self, path: impl AsRef<Path>, ratio: f64) -> Result<SeedReport> {
        let path = path.as_ref();
        let lines = read_seed_lines(path, ratio)?;
        let report = self.seed(&lines);

        tracing::info!(
            "🌱 Seeded from {}: {} lines ingested, {} skipped",
            path.display(),
            report.ingested,
            report.skipped
        );

        Ok(report)
    }

    pub fn format(&self) -> &CompiledFormat {
        &self.format
    }

    pub fn engine(&self) -> &GramEngine {
        &self.engine
    }

    pub fn registry(&self) -> &TemplateRegistry {
        self.miner.registry()
    }

    pub fn ratio_histogram(&self) -> &RatioHistogram {
        self.miner.ratio_histogram()
    }

    pub fn stats(&self) -> MinerStats {
        self.stats
    }
}
