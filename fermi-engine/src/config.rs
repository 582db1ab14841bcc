//! Engine configuration
//!
//! One TOML file, every section optional:
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [engine]
//! max_concurrency = 4
//! network_timeout_ms = 3000
//! in_memory_timeout_ms = 50
//! rejected_sample_size = 3
//!
//! [comparability]
//! adopt_threshold = 3.5
//! reference_threshold = 2.5
//!
//! [aggregation]
//! central_tendency = "median"
//! convergence_threshold = 1.3
//!
//! [sources.model]
//! enabled = true
//! endpoint = "https://api.openai.com/v1"
//! model = "gpt-4o-mini"
//! ```
//!
//! The model API key resolves with priority ENV (`FERMI_MODEL_API_KEY`) → TOML.

use crate::aggregator::AggregationPolicy;
use crate::collector::CollectorSettings;
use crate::comparability::ComparabilityPolicy;
use crate::sources::ai_augmented::ConfidenceEnvelope;
use crate::sources::behavioral::BehavioralInsightConfig;
use crate::sources::constraint::PhysicalConstraintConfig;
use crate::sources::dataset::StructuredDatasetConfig;
use crate::sources::definite::DefiniteDataConfig;
use crate::sources::legal::LegalNormConfig;
use crate::sources::statistical::StatisticalHeuristicConfig;
use fermi_common::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the model API key
pub const MODEL_API_KEY_ENV_VAR: &str = "FERMI_MODEL_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub engine: EngineSettings,
    pub comparability: ComparabilityPolicy,
    pub aggregation: AggregationPolicy,
    pub sources: SourcesConfig,
}

impl EngineConfig {
    /// Load from `path`, or defaults when no file is configured or it is missing
    pub fn load(path: Option<&Path>) -> fermi_common::Result<Self> {
        fermi_common::config::load_or_default(path)
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            max_concurrency: self.engine.max_concurrency.max(1),
            network_timeout: Duration::from_millis(self.engine.network_timeout_ms),
            in_memory_timeout: Duration::from_millis(self.engine.in_memory_timeout_ms),
        }
    }
}

/// `[engine]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum sources queried at once
    pub max_concurrency: usize,
    /// Per-source timeout for network-bound sources
    pub network_timeout_ms: u64,
    /// Per-source timeout for in-memory sources
    pub in_memory_timeout_ms: u64,
    /// Rejected candidates kept in the audit document (at most 3)
    pub rejected_sample_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            network_timeout_ms: 3000,
            in_memory_timeout_ms: 50,
            rejected_sample_size: 3,
        }
    }
}

/// `[sources]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub definite: DefiniteDataConfig,
    pub legal: LegalNormConfig,
    pub constraints: PhysicalConstraintConfig,
    pub statistical: StatisticalHeuristicConfig,
    pub behavioral: BehavioralInsightConfig,
    pub datasets: StructuredDatasetConfig,
    pub benchmark_index: BenchmarkIndexConfig,
    pub model: ModelConfig,
}

/// `[sources.benchmark_index]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkIndexConfig {
    /// JSON catalog file; no index source when unset
    pub path: Option<PathBuf>,
}

/// `[sources.model]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub requests_per_second: u32,
    pub request_timeout_ms: u64,
    pub envelope: ConfidenceEnvelope,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            requests_per_second: 2,
            request_timeout_ms: 10_000,
            envelope: ConfidenceEnvelope::default(),
        }
    }
}

/// Resolve the model API key
///
/// **Priority:** ENV → TOML
pub fn resolve_model_api_key(config: &ModelConfig) -> Option<String> {
    let env_key = std::env::var(MODEL_API_KEY_ENV_VAR).ok().filter(|k| is_valid_key(k));
    let toml_key = config.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Model API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Model API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("Model API key loaded from TOML config");
        return Some(key);
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
