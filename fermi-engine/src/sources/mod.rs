//! Evidence Sources
//!
//! Closed set of source variants queried in parallel for each estimation:
//!
//! 1. **definite** - Exact in-project values (confidence 1.0)
//! 2. **constraint** - Physical/mathematical hard bounds
//! 3. **legal** - Statutory fixed values
//! 4. **statistical** - Distributional heuristics over known aggregates
//! 5. **behavioral** - Behavioral-economics adjustments over baselines
//! 6. **ai_augmented** - Generative-model guesses with calibrated confidence
//! 7. **benchmark_index** - Rule-of-thumb catalog (exact + similarity lookup)
//! 8. **dataset** - Maintained registries with freshness-scored confidence
//!
//! Every variant shares one contract: given a target and a quantity, return
//! zero or more candidates. Failures stay inside the source; the public
//! `produce` never errors.

pub mod ai_augmented;
pub mod behavioral;
pub mod benchmark_index;
pub mod constraint;
pub mod dataset;
pub mod definite;
pub mod legal;
pub mod model_client;
pub mod statistical;

pub use ai_augmented::{AiAugmentedSource, ConfidenceEnvelope, GenerativeModel};
pub use behavioral::BehavioralInsightSource;
pub use benchmark_index::{BenchmarkCatalog, BenchmarkIndexSource, InMemoryBenchmarkIndex};
pub use constraint::PhysicalConstraintSource;
pub use dataset::StructuredDatasetSource;
pub use definite::DefiniteDataSource;
pub use legal::LegalNormSource;
pub use statistical::StatisticalHeuristicSource;

use crate::config::{resolve_model_api_key, SourcesConfig};
use crate::error::{EstimationError, SourceError};
use crate::types::{BenchmarkCandidate, SourceKind, TargetProfile};
use model_client::HttpModelClient;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum EvidenceSource {
    DefiniteData(DefiniteDataSource),
    PhysicalConstraint(PhysicalConstraintSource),
    LegalNorm(LegalNormSource),
    StatisticalHeuristic(StatisticalHeuristicSource),
    BehavioralInsight(BehavioralInsightSource),
    AiAugmented(AiAugmentedSource),
    BenchmarkIndex(BenchmarkIndexSource),
    StructuredDataset(StructuredDatasetSource),
}

impl EvidenceSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            EvidenceSource::DefiniteData(_) => SourceKind::DefiniteData,
            EvidenceSource::PhysicalConstraint(_) => SourceKind::PhysicalConstraint,
            EvidenceSource::LegalNorm(_) => SourceKind::LegalNorm,
            EvidenceSource::StatisticalHeuristic(_) => SourceKind::StatisticalHeuristic,
            EvidenceSource::BehavioralInsight(_) => SourceKind::BehavioralInsight,
            EvidenceSource::AiAugmented(_) => SourceKind::AiAugmented,
            EvidenceSource::BenchmarkIndex(_) => SourceKind::BenchmarkIndex,
            EvidenceSource::StructuredDataset(_) => SourceKind::StructuredDataset,
        }
    }

    /// Display name used in logs and source reports
    pub fn name(&self) -> String {
        match self {
            EvidenceSource::AiAugmented(source) => format!("{}:{}", self.kind(), source.model_name()),
            _ => self.kind().as_str().to_string(),
        }
    }

    /// Query the source, surfacing its failure
    pub async fn try_produce(
        &self,
        target: &TargetProfile,
        quantity: &str,
    ) -> Result<Vec<BenchmarkCandidate>, SourceError> {
        let candidates = match self {
            EvidenceSource::DefiniteData(source) => source.lookup(target, quantity),
            EvidenceSource::PhysicalConstraint(source) => source.bounds(target, quantity),
            EvidenceSource::LegalNorm(source) => source.lookup(target, quantity),
            EvidenceSource::StatisticalHeuristic(source) => source.apply(target, quantity),
            EvidenceSource::BehavioralInsight(source) => source.apply(target, quantity),
            EvidenceSource::AiAugmented(source) => source.estimate(target, quantity).await?,
            EvidenceSource::BenchmarkIndex(source) => source.lookup(quantity),
            EvidenceSource::StructuredDataset(source) => source.query(quantity),
        };
        Ok(candidates)
    }

    /// Query the source; failures are logged and yield no candidates
    pub async fn produce(&self, target: &TargetProfile, quantity: &str) -> Vec<BenchmarkCandidate> {
        match self.try_produce(target, quantity).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(source = %self.name(), "Evidence source failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Build the configured source set, in registration order.
///
/// The rule-based sources are always present. The benchmark index, datasets
/// and model source are added only when configured.
pub fn build_sources(config: &SourcesConfig) -> Result<Vec<EvidenceSource>, EstimationError> {
    let mut sources = vec![
        EvidenceSource::DefiniteData(DefiniteDataSource::new(&config.definite)),
        EvidenceSource::LegalNorm(LegalNormSource::new(&config.legal)),
        EvidenceSource::PhysicalConstraint(PhysicalConstraintSource::new(&config.constraints)),
        EvidenceSource::StatisticalHeuristic(StatisticalHeuristicSource::new(&config.statistical)),
        EvidenceSource::BehavioralInsight(BehavioralInsightSource::new(&config.behavioral)),
    ];

    let datasets = StructuredDatasetSource::new(&config.datasets);
    if !datasets.is_empty() {
        sources.push(EvidenceSource::StructuredDataset(datasets));
    }

    if let Some(path) = &config.benchmark_index.path {
        let index = InMemoryBenchmarkIndex::from_json_file(path)?;
        info!(path = %path.display(), entries = index.len(), "Benchmark index registered");
        sources.push(EvidenceSource::BenchmarkIndex(BenchmarkIndexSource::new(Arc::new(index))));
    }

    if config.model.enabled {
        match resolve_model_api_key(&config.model) {
            Some(api_key) => {
                let client = HttpModelClient::new(&config.model, api_key)
                    .map_err(|e| EstimationError::Config(e.to_string()))?;
                sources.push(EvidenceSource::AiAugmented(AiAugmentedSource::new(
                    Arc::new(client),
                    config.model.envelope,
                )));
            }
            None => warn!("Model source enabled but no API key configured; skipping it"),
        }
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourcesConfig;

    #[tokio::test]
    async fn test_default_sources_are_rule_based() {
        let sources = build_sources(&SourcesConfig::default()).unwrap();
        let kinds: Vec<_> = sources.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SourceKind::DefiniteData,
                SourceKind::LegalNorm,
                SourceKind::PhysicalConstraint,
                SourceKind::StatisticalHeuristic,
                SourceKind::BehavioralInsight,
            ]
        );
    }

    #[tokio::test]
    async fn test_produce_dispatches_to_variant() {
        let sources = build_sources(&SourcesConfig::default()).unwrap();
        let target = TargetProfile::new("Cafe", "service", "B2C");

        let legal = &sources[1];
        let candidates = legal.produce(&target, "minimum hourly wage").await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_kind, SourceKind::LegalNorm);
    }

    #[test]
    fn test_missing_index_file_is_config_error() {
        let mut config = SourcesConfig::default();
        config.benchmark_index.path = Some("/nonexistent/fermi/index.json".into());
        assert!(build_sources(&config).is_err());
    }
}
