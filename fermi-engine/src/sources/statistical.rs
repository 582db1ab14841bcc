//! Statistical heuristics
//!
//! Distributional rules of thumb (Pareto 80/20, typical churn bands) applied to
//! a known aggregate: `value = aggregate * share`. A rule fires only when the
//! quantity matches one of its keywords and its aggregate is configured.
//! Confidence never exceeds 0.6.

use crate::types::{normalize_key, BenchmarkCandidate, Confidence, SourceKind, TargetProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest confidence a heuristic candidate may carry
pub const STATISTICAL_CONFIDENCE_CAP: Confidence = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRule {
    pub name: String,
    pub keywords: Vec<String>,
    /// Key into the configured aggregates
    pub aggregate: String,
    pub share: f64,
    #[serde(default = "default_rule_confidence")]
    pub confidence: Confidence,
    #[serde(default)]
    pub reasoning: String,
}

fn default_rule_confidence() -> Confidence {
    STATISTICAL_CONFIDENCE_CAP
}

/// `[sources.statistical]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticalHeuristicConfig {
    /// Known aggregates (e.g. "total revenue" = 5.0e9)
    pub aggregates: BTreeMap<String, f64>,
    pub rules: Vec<HeuristicRule>,
}

impl Default for StatisticalHeuristicConfig {
    fn default() -> Self {
        Self {
            aggregates: BTreeMap::new(),
            rules: vec![
                HeuristicRule {
                    name: "pareto_80_20".to_string(),
                    keywords: vec!["top 20%".to_string(), "top customers".to_string(), "pareto".to_string()],
                    aggregate: "total revenue".to_string(),
                    share: 0.8,
                    confidence: 0.6,
                    reasoning: "Top 20% of customers typically account for 80% of revenue".to_string(),
                },
                HeuristicRule {
                    name: "typical_monthly_churn".to_string(),
                    keywords: vec!["churned subscribers".to_string(), "monthly cancellations".to_string()],
                    aggregate: "subscribers".to_string(),
                    share: 0.05,
                    confidence: 0.5,
                    reasoning: "Subscription services typically lose about 5% of subscribers per month".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticalHeuristicSource {
    aggregates: BTreeMap<String, f64>,
    rules: Vec<HeuristicRule>,
}

impl StatisticalHeuristicSource {
    pub fn new(config: &StatisticalHeuristicConfig) -> Self {
        Self {
            aggregates: config
                .aggregates
                .iter()
                .map(|(k, v)| (normalize_key(k), *v))
                .collect(),
            rules: config.rules.clone(),
        }
    }

    pub fn apply(&self, target: &TargetProfile, quantity: &str) -> Vec<BenchmarkCandidate> {
        let key = normalize_key(quantity);

        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|k| key.contains(&normalize_key(k))))
            .filter_map(|rule| {
                let aggregate = *self.aggregates.get(&normalize_key(&rule.aggregate))?;
                let value = aggregate * rule.share;
                Some(
                    BenchmarkCandidate::for_target(
                        target,
                        rule.name.clone(),
                        value,
                        format!("heuristic:{}", rule.name),
                        SourceKind::StatisticalHeuristic,
                    )
                    .with_confidence(rule.confidence.min(STATISTICAL_CONFIDENCE_CAP))
                    .with_context("aggregate", rule.aggregate.as_str())
                    .with_context("aggregate_value", aggregate)
                    .with_context("share", rule.share)
                    .with_context("reasoning", rule.reasoning.as_str()),
                )
            })
            .collect()
    }
}
