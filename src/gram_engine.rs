//! Online unigram / bigram / trigram frequency tables.
//!
//! Each table is bounded and evicts its least-recently-used gram when a new
//! one arrives at capacity. Reads count as use, so a gram that keeps being
//! consulted during classification stays resident.
use lru::LruCache;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::num::NonZeroUsize;

/// Joins the tokens of a bigram or trigram key.
pub const GRAM_SEPARATOR: char = '^';

type FxBuildHasher = BuildHasherDefault<FxHasher>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GramOrder {
    Unigram = 1,
    Bigram = 2,
    Trigram = 3,
}

impl GramOrder {
    pub const ALL: [GramOrder; 3] = [GramOrder::Unigram, GramOrder::Bigram, GramOrder::Trigram];

    pub fn as_usize(self) -> usize {
        self as usize
    }
}

/// Build the key for a 1-, 2- or 3-token gram.
pub fn gram_key<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut key = String::with_capacity(tokens.iter().map(|t| t.as_ref().len() + 1).sum());
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            key.push(GRAM_SEPARATOR);
        }
        key.push_str(token.as_ref());
    }
    key
}

/// One bounded gram → count table.
pub struct GramTable {
    entries: LruCache<String, u64, FxBuildHasher>,
    evictions: u64,
}

impl GramTable {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::with_hasher(capacity, FxBuildHasher::default()),
            evictions: 0,
        }
    }

    /// Count one occurrence of `key` and return its new count.
    pub fn increment(&mut self, key: &str) -> u64 {
        if let Some(count) = self.entries.get_mut(key) {
            *count += 1;
            return *count;
        }

        if let Some((evicted, count)) = self.entries.push(key.to_string(), 1) {
            self.evictions += 1;
            tracing::trace!(gram = %evicted, count, "evicted least recently used gram");
        }
        1
    }

    /// Count for `key`, marking it as recently used.
    pub fn get(&mut self, key: &str) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Count for `key` without touching recency.
    pub fn peek(&self, key: &str) -> Option<u64> {
        self.entries.peek(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

pub struct GramEngine {
    unigrams: GramTable,
    bigrams: GramTable,
    trigrams: GramTable,
}

impl GramEngine {
    /// Every table gets the same capacity.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            unigrams: GramTable::new(capacity),
            bigrams: GramTable::new(capacity),
            trigrams: GramTable::new(capacity),
        }
    }

    pub fn table(&self, order: GramOrder) -> &GramTable {
        match order {
            GramOrder::Unigram => &self.unigrams,
            GramOrder::Bigram => &self.bigrams,
            GramOrder::Trigram => &self.trigrams,
        }
    }

    fn table_mut(&mut self, order: GramOrder) -> &mut GramTable {
        match order {
            GramOrder::Unigram => &mut self.unigrams,
            GramOrder::Bigram => &mut self.bigrams,
            GramOrder::Trigram => &mut self.trigrams,
        }
    }

    pub fn increment(&mut self, order: GramOrder, key: &str) -> u64 {
        self.table_mut(order).increment(key)
    }

    pub fn get(&mut self, order: GramOrder, key: &str) -> Option<u64> {
        self.table_mut(order).get(key)
    }

    /// Fold one line's tokens into the statistics.
    pub fn ingest<S: AsRef<str>>(&mut self, tokens: &[S]) {
        for i in 0..tokens.len() {
            self.unigrams.increment(tokens[i].as_ref());
            if i > 0 {
                self.bigrams.increment(&gram_key(&tokens[i - 1..=i]));
            }
            if i > 1 {
                self.trigrams.increment(&gram_key(&tokens[i - 2..=i]));
            }
        }
    }

    /// `count(a^b) / count(a)`, or 0 when either gram is unknown.
    pub fn bigram_frequency(&mut self, a: &str, b: &str) -> f64 {
        let bigram = self.bigrams.get(&gram_key(&[a, b]));
        let unigram = self.unigrams.get(a);

        match (bigram, unigram) {
            (Some(pair), Some(single)) if single > 0 => pair as f64 / single as f64,
            _ => 0.0,
        }
    }

    /// `count(a^b^c) / count(a^b)`, or 0 when either gram is unknown.
    pub fn trigram_frequency(&mut self, a: &str, b: &str, c: &str) -> f64 {
        let trigram = self.trigrams.get(&gram_key(&[a, b, c]));
        let bigram = self.bigrams.get(&gram_key(&[a, b]));

        match (trigram, bigram) {
            (Some(triple), Some(pair)) if pair > 0 => triple as f64 / pair as f64,
            _ => 0.0,
        }
    }

    /// Total evictions across all three tables.
    pub fn evictions(&self) -> u64 {
        GramOrder::ALL
            .iter()
            .map(|&order| self.table(order).evictions())
            .sum()
    }
}
