//! Benchmark index: rule-of-thumb catalog
//!
//! Each entry groups several candidates under one key ("saas conversion rate"
//! -> three industry reports). Lookup is an exact key match first, then a
//! similarity fallback (Jaro-Winkler over normalized keys, ties broken by key
//! order). Similarity queries are memoized per normalized query string.
//!
//! Latency budgets: exact lookup under 1ms, similarity under 20ms. Overruns are
//! logged, never fatal.

use crate::types::{normalize_key, BenchmarkCandidate, Confidence, ContextMap, SourceKind};
use fermi_common::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const EXACT_LOOKUP_BUDGET: Duration = Duration::from_millis(1);
pub const SIMILARITY_LOOKUP_BUDGET: Duration = Duration::from_millis(20);

/// Default minimum Jaro-Winkler similarity for a fallback match
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.75;

/// Confidence multiplier applied to candidates reached by similarity
const SIMILARITY_DISCOUNT: f64 = 0.8;

/// Memo capacity; queries beyond it are answered but not remembered
const MEMO_CAPACITY: usize = 1024;

/// Catalog record as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub name: String,
    pub value: f64,
    pub product_type: String,
    pub consumer_type: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub is_essential: bool,
    pub source: String,
    #[serde(default = "default_record_confidence")]
    pub confidence: Confidence,
    #[serde(default)]
    pub context: ContextMap,
}

fn default_record_confidence() -> Confidence {
    0.7
}

impl BenchmarkRecord {
    fn into_candidate(self) -> BenchmarkCandidate {
        let mut candidate = BenchmarkCandidate::new(self.name, self.value, self.source, SourceKind::BenchmarkIndex)
            .with_profile(self.product_type, self.consumer_type)
            .with_price(self.price)
            .essential(self.is_essential)
            .with_confidence(self.confidence);
        candidate.context = self.context;
        candidate
    }
}

/// A keyed group of candidates
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkEntry {
    pub key: String,
    pub candidates: Vec<BenchmarkCandidate>,
}

/// Lookup interface over a benchmark catalog
pub trait BenchmarkCatalog: Send + Sync {
    /// Exact lookup by normalized key
    fn get(&self, key: &str) -> Option<Arc<BenchmarkEntry>>;

    /// Best entry whose key is similar enough to the query
    fn similarity_search(&self, query: &str) -> Option<Arc<BenchmarkEntry>>;
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(default = "default_min_similarity")]
    min_similarity: f64,
    entries: BTreeMap<String, Vec<BenchmarkRecord>>,
}

fn default_min_similarity() -> f64 {
    DEFAULT_MIN_SIMILARITY
}

/// BTreeMap-backed catalog with memoized similarity search
#[derive(Debug)]
pub struct InMemoryBenchmarkIndex {
    entries: BTreeMap<String, Arc<BenchmarkEntry>>,
    min_similarity: f64,
    memo: RwLock<HashMap<String, Option<String>>>,
}

impl Default for InMemoryBenchmarkIndex {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SIMILARITY)
    }
}

impl InMemoryBenchmarkIndex {
    pub fn new(min_similarity: f64) -> Self {
        Self {
            entries: BTreeMap::new(),
            min_similarity,
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Parse an index from JSON:
    /// `{"min_similarity": 0.75, "entries": {"key": [record, ...]}}`
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let file: IndexFile = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid benchmark index: {}", e)))?;

        let mut index = Self::new(file.min_similarity);
        for (key, records) in file.entries {
            index.insert(&key, records);
        }
        Ok(index)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read benchmark index {}: {}", path.display(), e)))?;
        let index = Self::from_json_str(&json)?;
        debug!(path = %path.display(), entries = index.len(), "Loaded benchmark index");
        Ok(index)
    }

    /// Add (or replace) an entry; clears memoized similarity results
    pub fn insert(&mut self, key: &str, records: Vec<BenchmarkRecord>) {
        let key = normalize_key(key);
        let candidates = records.into_iter().map(BenchmarkRecord::into_candidate).collect();
        self.entries.insert(
            key.clone(),
            Arc::new(BenchmarkEntry { key, candidates }),
        );
        if let Ok(mut memo) = self.memo.write() {
            memo.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    fn best_match(&self, query: &str) -> Option<String> {
        let mut best: Option<(&String, f64)> = None;
        for key in self.entries.keys() {
            let score = strsim::jaro_winkler(query, key);
            // Strict comparison keeps the first key in order on ties
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((key, score));
            }
        }

        best.filter(|(_, score)| *score >= self.min_similarity)
            .map(|(key, _)| key.clone())
    }
}

impl BenchmarkCatalog for InMemoryBenchmarkIndex {
    fn get(&self, key: &str) -> Option<Arc<BenchmarkEntry>> {
        self.entries.get(&normalize_key(key)).cloned()
    }

    fn similarity_search(&self, query: &str) -> Option<Arc<BenchmarkEntry>> {
        let query = normalize_key(query);

        let memoized = self.memo.read().ok().and_then(|memo| memo.get(&query).cloned());
        let matched = match memoized {
            Some(hit) => hit,
            None => {
                let hit = self.best_match(&query);
                if let Ok(mut memo) = self.memo.write() {
                    if memo.len() < MEMO_CAPACITY {
                        memo.insert(query, hit.clone());
                    }
                }
                hit
            }
        };

        matched.and_then(|key| self.entries.get(&key).cloned())
    }
}

/// Evidence source over any catalog implementation
#[derive(Clone)]
pub struct BenchmarkIndexSource {
    catalog: Arc<dyn BenchmarkCatalog>,
}

impl BenchmarkIndexSource {
    pub fn new(catalog: Arc<dyn BenchmarkCatalog>) -> Self {
        Self { catalog }
    }

    pub fn lookup(&self, quantity: &str) -> Vec<BenchmarkCandidate> {
        let started = Instant::now();
        if let Some(entry) = self.catalog.get(quantity) {
            warn_if_slow("exact", started.elapsed(), EXACT_LOOKUP_BUDGET);
            return entry
                .candidates
                .iter()
                .cloned()
                .map(|c| c.with_context("match", "exact"))
                .collect();
        }

        let started = Instant::now();
        let entry = self.catalog.similarity_search(quantity);
        warn_if_slow("similarity", started.elapsed(), SIMILARITY_LOOKUP_BUDGET);

        match entry {
            Some(entry) => {
                debug!(query = quantity, matched = %entry.key, "Benchmark index similarity match");
                entry
                    .candidates
                    .iter()
                    .cloned()
                    .map(|c| {
                        let discounted = c.confidence * SIMILARITY_DISCOUNT;
                        c.with_confidence(discounted)
                            .with_context("match", "similarity")
                            .with_context("matched_key", entry.key.as_str())
                    })
                    .collect()
            }
            None => Vec::new(),
        }
    }
}

impl std::fmt::Debug for BenchmarkIndexSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkIndexSource").finish_non_exhaustive()
    }
}

fn warn_if_slow(kind: &str, elapsed: Duration, budget: Duration) {
    if elapsed > budget {
        warn!(
            lookup = kind,
            elapsed_us = elapsed.as_micros() as u64,
            budget_us = budget.as_micros() as u64,
            "Benchmark index lookup exceeded latency budget"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_JSON: &str = r#"{
        "entries": {
            "SaaS conversion rate": [
                {"name": "Industry report A", "value": 0.03, "product_type": "digital",
                 "consumer_type": "B2B", "source": "report-a", "confidence": 0.8},
                {"name": "Industry report B", "value": 0.05, "product_type": "software",
                 "consumer_type": "B2B", "source": "report-b"}
            ],
            "subscription churn": [
                {"name": "Churn survey", "value": 0.06, "product_type": "service",
                 "consumer_type": "B2C", "source": "survey"}
            ]
        }
    }"#;

    #[test]
    fn test_load_and_exact_get() {
        let index = InMemoryBenchmarkIndex::from_json_str(INDEX_JSON).unwrap();
        assert_eq!(index.len(), 2);

        let entry = index.get("saas  conversion rate").unwrap();
        assert_eq!(entry.candidates.len(), 2);
        assert_eq!(entry.candidates[1].confidence, 0.7, "Default record confidence");
    }

    #[test]
    fn test_similarity_search_finds_near_key() {
        let index = InMemoryBenchmarkIndex::from_json_str(INDEX_JSON).unwrap();
        let entry = index.similarity_search("saas conversion rates").unwrap();
        assert_eq!(entry.key, "saas conversion rate");
    }

    #[test]
    fn test_similarity_search_below_threshold() {
        let index = InMemoryBenchmarkIndex::from_json_str(INDEX_JSON).unwrap();
        assert!(index.similarity_search("zzzz qqqq").is_none());
    }

    #[test]
    fn test_similarity_result_is_memoized() {
        let index = InMemoryBenchmarkIndex::from_json_str(INDEX_JSON).unwrap();
        let first = index.similarity_search("subscription churns");
        let second = index.similarity_search("Subscription   churns");
        assert_eq!(first, second);
        assert_eq!(index.memo.read().unwrap().len(), 1);
    }

    #[test]
    fn test_source_discounts_similarity_matches() {
        let index = InMemoryBenchmarkIndex::from_json_str(INDEX_JSON).unwrap();
        let source = BenchmarkIndexSource::new(Arc::new(index));

        let exact = source.lookup("SaaS conversion rate");
        assert_eq!(exact[0].confidence, 0.8);
        assert_eq!(exact[0].context["match"], "exact");

        let similar = source.lookup("saas conversion rates");
        assert!((similar[0].confidence - 0.64).abs() < 1e-9);
        assert_eq!(similar[0].context["matched_key"], "saas conversion rate");
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let result = InMemoryBenchmarkIndex::from_json_str("{\"entries\": 5}");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
