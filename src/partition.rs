//! Parallel mining by stream partition.
//!
//! Every partition owns a private [`LogMiner`]. A line always goes to the
//! same partition (chosen by hashing its partition field), so each miner
//! still sees its lines strictly in order while partitions run in parallel.
//! Template ids are local to a partition.
use crate::config::MinerConfig;
use crate::log_format::CompiledFormat;
use crate::pipeline::{read_seed_lines, LineOutcome, LogMiner, MinerStats, SeedReport};
use anyhow::Result;
use rayon::prelude::*;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

pub struct PartitionedMiner {
    workers: Vec<LogMiner>,
    router: CompiledFormat,
    partition_field: Option<String>,
}

impl PartitionedMiner {
    /// Build `config.partitions` miners. When a seed file is configured it
    /// is read once and every partition is seeded before any line is served.
    pub fn new(config: &MinerConfig) -> Result<Self> {
        let router = config.validate()?;

        let workers = (0..config.partitions)
            .map(|_| LogMiner::new(config))
            .collect::<Result<Vec<_>, _>>()?;

        let mut miner = Self {
            workers,
            router,
            partition_field: config.partition_field.clone(),
        };

        if let Some(path) = &config.seed_file {
            let lines = read_seed_lines(path, config.seed_ratio)?;
            let report = miner.seed(&lines);
            tracing::info!(
                "🌱 Seeded {} partitions from {}: {} lines ingested, {} skipped",
                miner.partitions(),
                path.display(),
                report.ingested,
                report.skipped
            );
        }

        Ok(miner)
    }

    pub fn partitions(&self) -> usize {
        self.workers.len()
    }

    /// Partition index for a raw line. Lines without the partition field
    /// (including lines that do not match the format) go to partition 0.
    pub fn route(&self, line: &str) -> usize {
        let partitions = self.workers.len();
        if partitions == 1 {
            return 0;
        }

        let Some(field) = &self.partition_field else {
            return 0;
        };

        match self
            .router
            .extract_fields(line)
            .and_then(|fields| fields.get(field.as_str()).copied())
        {
            Some(key) => {
                let mut hasher = FxHasher::default();
                key.hash(&mut hasher);
                (hasher.finish() % partitions as u64) as usize
            }
            None => 0,
        }
    }

    /// Process one line on its partition.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        let idx = self.route(line);
        self.workers[idx].process_line(line)
    }

    /// Process a batch. Partitions run in parallel; within a partition lines
    /// keep their batch order. Outcomes come back in batch order.
    pub fn process_batch<S: AsRef<str> + Sync>(&mut self, lines: &[S]) -> Vec<LineOutcome> {
        let mut routed: Vec<Vec<usize>> = vec![Vec::new(); self.workers.len()];
        for (i, line) in lines.iter().enumerate() {
            routed[self.route(line.as_ref())].push(i);
        }

        let per_partition: Vec<Vec<(usize, LineOutcome)>> = self
            .workers
            .par_iter_mut()
            .zip(routed.par_iter())
            .map(|(worker, indices)| {
                indices
                    .iter()
                    .map(|&i| (i, worker.process_line(lines[i].as_ref())))
                    .collect()
            })
            .collect();

        let mut outcomes: Vec<Option<LineOutcome>> = vec![None; lines.len()];
        for (i, outcome) in per_partition.into_iter().flatten() {
            outcomes[i] = Some(outcome);
        }

        outcomes.into_iter().flatten().collect()
    }

    /// Seed every partition with the same historical lines. The report is
    /// summed over partitions.
    pub fn seed<S: AsRef<str> + Sync>(&mut self, lines: &[S]) -> SeedReport {
        self.workers
            .par_iter_mut()
            .map(|worker| worker.seed(lines.iter().map(|l| l.as_ref())))
            .reduce(SeedReport::default, |mut total, report| {
                total.merge(report);
                total
            })
    }

    pub fn workers(&self) -> &[LogMiner] {
        &self.workers
    }

    /// Stats summed over all partitions.
    pub fn stats(&self) -> MinerStats {
        self.workers
            .iter()
            .map(LogMiner::stats)
            .fold(MinerStats::default(), |acc, s| MinerStats {
                lines_seen: acc.lines_seen + s.lines_seen,
                lines_mined: acc.lines_mined + s.lines_mined,
                skipped_format_mismatch: acc.skipped_format_mismatch + s.skipped_format_mismatch,
                skipped_empty_content: acc.skipped_empty_content + s.skipped_empty_content,
                lines_seeded: acc.lines_seeded + s.lines_seeded,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(partitions: usize) -> MinerConfig {
        MinerConfig::new()
            .with_log_format("<host> <message>")
            .with_partitions(partitions, Some("host"))
    }

    #[test]
    fn test_same_key_same_partition() {
        let miner = PartitionedMiner::new(&config(4)).unwrap();

        let a = miner.route("web-1 GET /index");
        let b = miner.route("web-1 POST /login");
        assert_eq!(a, b);
        assert!(a < 4);
    }

    #[test]
    fn test_unmatched_lines_route_to_zero() {
        let miner = PartitionedMiner::new(&config(4)).unwrap();
        assert_eq!(miner.route("lonely"), 0);
    }

    #[test]
    fn test_seed_report_is_summed() {
        let mut miner = PartitionedMiner::new(&config(3)).unwrap();
        let report = miner.seed(&["web-1 cache warmed up", "broken"]);

        assert_eq!(report.ingested, 3);
        assert_eq!(report.skipped, 3);
        assert_eq!(miner.stats().lines_seeded, 3);
    }

    #[test]
    fn test_batch_keeps_order_and_counts() {
        let mut miner = PartitionedMiner::new(&config(3)).unwrap();
        let lines = vec![
            "web-1 user alice logged in",
            "db-1 vacuum finished",
            "broken",
            "web-1 user bob logged in",
        ];

        let outcomes = miner.process_batch(&lines);
        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[2].is_skipped());
        assert_eq!(
            outcomes[0].mined().unwrap().template,
            "user <*> <*> <*> "
        );

        let stats = miner.stats();
        assert_eq!(stats.lines_seen, 4);
        assert_eq!(stats.lines_mined, 3);
        assert_eq!(stats.skipped_format_mismatch, 1);
    }
}
