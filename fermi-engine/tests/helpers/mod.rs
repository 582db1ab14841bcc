//! Test Helper Utilities
//!
//! Scripted model sources and candidate builders shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use fermi_engine::sources::ai_augmented::{AiAugmentedSource, ConfidenceEnvelope, GenerativeModel};
use fermi_engine::sources::benchmark_index::{BenchmarkIndexSource, BenchmarkRecord, InMemoryBenchmarkIndex};
use fermi_engine::{CollectorSettings, EvidenceSource, ModelError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Model that answers with a fixed value after a delay, or fails
pub struct FixedModel {
    pub name: &'static str,
    pub delay: Duration,
    pub value: Option<f64>,
}

#[async_trait]
impl GenerativeModel for FixedModel {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(&self, _prompt: &str, _schema: &serde_json::Value) -> Result<serde_json::Value, ModelError> {
        tokio::time::sleep(self.delay).await;
        match self.value {
            Some(value) => Ok(json!({"value": value, "unit": "units", "confidence": 0.9})),
            None => Err(ModelError::Api("scripted failure".to_string())),
        }
    }
}

pub fn model_source(name: &'static str, delay: Duration, value: Option<f64>) -> EvidenceSource {
    EvidenceSource::AiAugmented(AiAugmentedSource::new(
        Arc::new(FixedModel { name, delay, value }),
        ConfidenceEnvelope::default(),
    ))
}

/// Catalog record with the given comparability profile
pub fn record(
    name: &str,
    value: f64,
    product_type: &str,
    consumer_type: &str,
    price: Option<f64>,
    is_essential: bool,
) -> BenchmarkRecord {
    BenchmarkRecord {
        name: name.to_string(),
        value,
        product_type: product_type.to_string(),
        consumer_type: consumer_type.to_string(),
        price,
        is_essential,
        source: format!("catalog:{}", name),
        confidence: 0.8,
        context: Default::default(),
    }
}

/// Benchmark index source holding one entry
pub fn index_source(key: &str, records: Vec<BenchmarkRecord>) -> EvidenceSource {
    let mut index = InMemoryBenchmarkIndex::default();
    index.insert(key, records);
    EvidenceSource::BenchmarkIndex(BenchmarkIndexSource::new(Arc::new(index)))
}

pub fn settings(network_timeout_ms: u64) -> CollectorSettings {
    CollectorSettings {
        max_concurrency: 4,
        network_timeout: Duration::from_millis(network_timeout_ms),
        in_memory_timeout: Duration::from_millis(50),
    }
}
