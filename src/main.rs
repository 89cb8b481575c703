/// Log template miner
///
/// Reads log lines from `LOGMINER_INPUT` (a file) or stdin, mines a template for
/// each one and writes one JSON record per line to stdout.
///
/// Configuration comes from `LOGMINER_CONFIG` (a JSON file) or from the
/// `LOGMINER_*` environment variables. `LOGMINER_TEMPLATES_OUT` names an
/// optional CSV file for the template summary.
use anyhow::{Context, Result};
use log_template_miner::record::MinedRecord;
use log_template_miner::template_export::save_templates_csv;
use log_template_miner::{MinerConfig, PartitionedMiner};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const BATCH_SIZE: usize = 10_000;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the records, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("❌ Configuration error: {:#}", e);
            tracing::error!("💡 Set LOGMINER_CONFIG to a JSON file, or the environment variables:");
            tracing::error!("   - LOGMINER_LOG_FORMAT: line layout (default: \"<date> <time> <message>\")");
            tracing::error!("   - LOGMINER_CONTENT_FIELD: placeholder to mine (default: message)");
            tracing::error!("   - LOGMINER_USER_PATTERNS: JSON array of extra masking regexes");
            tracing::error!("   - LOGMINER_THRESHOLD: dynamic token threshold in [0, 1]");
            tracing::error!("   - LOGMINER_MAX_GRAM_DICT_SIZE: capacity of each gram table");
            tracing::error!("   - LOGMINER_SEED_FILE / LOGMINER_SEED_RATIO: optional warm-up data");
            tracing::error!("   - LOGMINER_INPUT: log file to mine (default: stdin)");
            tracing::error!("   - LOGMINER_PARTITIONS / LOGMINER_PARTITION_FIELD: parallel streams");
            std::process::exit(1);
        }
    };

    config.log_config();

    let mut miner = PartitionedMiner::new(&config)?;
    let input: Box<dyn BufRead> = match &config.input_file {
        Some(path) => Box::new(BufReader::new(File::open(path).with_context(|| {
            format!("Failed to open log file: {}", path.display())
        })?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let start = Instant::now();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut batch = Vec::with_capacity(BATCH_SIZE);

    for line in input.lines() {
        batch.push(line.context("Failed to read log line")?);
        if batch.len() >= BATCH_SIZE {
            flush_batch(&mut miner, &mut batch, &config, &mut out)?;
        }
    }
    flush_batch(&mut miner, &mut batch, &config, &mut out)?;
    out.flush()?;

    let stats = miner.stats();
    let elapsed = start.elapsed().as_secs_f64();
    let templates: usize = miner.workers().iter().map(|w| w.registry().len()).sum();

    info!("✅ Mining complete");
    info!("   Lines seen:     {}", stats.lines_seen);
    info!("   Lines mined:    {}", stats.lines_mined);
    info!(
        "   Lines skipped:  {} (format mismatch: {}, empty content: {})",
        stats.skipped(),
        stats.skipped_format_mismatch,
        stats.skipped_empty_content
    );
    info!("   Templates:      {}", templates);
    info!(
        "   Throughput:     {:.0} lines/sec",
        stats.lines_seen as f64 / elapsed.max(f64::EPSILON)
    );

    if let Ok(path) = std::env::var("LOGMINER_TEMPLATES_OUT") {
        let rows = save_templates_csv(
            &path,
            miner
                .workers()
                .iter()
                .enumerate()
                .map(|(i, w)| (i, w.registry())),
        )?;
        info!("💾 Wrote {} templates to {}", rows, path);
    }

    Ok(())
}

fn load_config() -> Result<MinerConfig> {
    match std::env::var("LOGMINER_CONFIG") {
        Ok(path) => Ok(MinerConfig::from_json_file(path)?),
        Err(_) => Ok(MinerConfig::from_env()?),
    }
}

fn flush_batch<W: Write>(
    miner: &mut PartitionedMiner,
    batch: &mut Vec<String>,
    config: &MinerConfig,
    out: &mut W,
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }

    let outcomes = miner.process_batch(batch.as_slice());
    for (line, outcome) in batch.drain(..).zip(outcomes) {
        let record = MinedRecord::new(line, outcome);
        serde_json::to_writer(&mut *out, &record.to_json(&config.output_fields))?;
        out.write_all(b"\n")?;
    }

    Ok(())
}
