use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Distribution of the conditional frequency ratios computed while
/// classifying tokens. Useful for picking a dynamic-token threshold: a
/// healthy stream shows two humps, near 0 (variables) and near 1 (structure).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatioHistogram {
    /// Keyed by the ratio's bit pattern so exact values are kept apart
    counts: FxHashMap<u64, usize>,
    pub total: usize,
}

impl RatioHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ratio: f64) {
        *self.counts.entry(ratio.to_bits()).or_insert(0) += 1;
        self.total += 1;
    }

    pub fn get_count(&self, ratio: f64) -> usize {
        self.counts.get(&ratio.to_bits()).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// `(ratio, share of observations)` sorted by ratio.
    pub fn distribution(&self) -> Vec<(f64, f64)> {
        if self.total == 0 {
            return Vec::new();
        }

        let inv_total = 1.0 / self.total as f64;
        let mut dist: Vec<(f64, f64)> = self
            .counts
            .iter()
            .map(|(&bits, &count)| (f64::from_bits(bits), count as f64 * inv_total))
            .collect();
        dist.sort_by(|a, b| a.0.total_cmp(&b.0));
        dist
    }

    /// Share of observations at or below `threshold`, i.e. how often a
    /// given threshold would have called a position dynamic.
    pub fn share_at_or_below(&self, threshold: f64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }

        let hits: usize = self
            .counts
            .iter()
            .filter(|&(&bits, _)| f64::from_bits(bits) <= threshold)
            .map(|(_, &count)| count)
            .sum();
        hits as f64 / self.total as f64
    }

    pub fn merge(&mut self, other: &RatioHistogram) {
        for (&bits, &count) in &other.counts {
            *self.counts.entry(bits).or_insert(0) += count;
            self.total += count;
        }
    }
}
