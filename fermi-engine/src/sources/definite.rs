//! Definite data: exact in-project values
//!
//! Values the project already knows (KPI sheets, contracts, measured data).
//! Lookup is an exact match on the normalized quantity description and yields
//! at most one candidate with confidence 1.0.

use crate::types::{normalize_key, BenchmarkCandidate, SourceKind, TargetProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefiniteValue {
    pub value: f64,
    /// Where the value was recorded
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// `[sources.definite]` config section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefiniteDataConfig {
    /// Quantity description -> known value
    pub values: BTreeMap<String, DefiniteValue>,
}

#[derive(Debug, Clone, Default)]
pub struct DefiniteDataSource {
    values: BTreeMap<String, DefiniteValue>,
}

impl DefiniteDataSource {
    pub fn new(config: &DefiniteDataConfig) -> Self {
        let values = config
            .values
            .iter()
            .map(|(key, value)| (normalize_key(key), value.clone()))
            .collect();
        Self { values }
    }

    pub fn insert(&mut self, key: &str, value: DefiniteValue) {
        self.values.insert(normalize_key(key), value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn lookup(&self, target: &TargetProfile, quantity: &str) -> Vec<BenchmarkCandidate> {
        let key = normalize_key(quantity);
        let Some(known) = self.values.get(&key) else {
            return Vec::new();
        };

        let source = known.source.clone().unwrap_or_else(|| "project data".to_string());
        let mut candidate = BenchmarkCandidate::for_target(target, key, known.value, source, SourceKind::DefiniteData)
            .with_confidence(1.0);
        if let Some(unit) = &known.unit {
            candidate = candidate.with_context("unit", unit.as_str());
        }
        vec![candidate]
    }
}
