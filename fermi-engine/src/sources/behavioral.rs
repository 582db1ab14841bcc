//! Behavioral insights
//!
//! Behavioral-economics adjustments to a known baseline: loss aversion damps
//! cancellations relative to sign-ups, anchoring lifts willingness to pay
//! toward a reference price. `value = baseline * multiplier`, confidence <= 0.5.

use crate::types::{normalize_key, BenchmarkCandidate, Confidence, SourceKind, TargetProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BEHAVIORAL_CONFIDENCE_CAP: Confidence = 0.5;

/// Losses weigh roughly twice as much as equivalent gains
pub const LOSS_AVERSION_COEFFICIENT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralEffect {
    pub name: String,
    pub keywords: Vec<String>,
    /// Key into the configured baselines
    pub baseline: String,
    pub multiplier: f64,
    #[serde(default = "default_effect_confidence")]
    pub confidence: Confidence,
    #[serde(default)]
    pub reasoning: String,
}

fn default_effect_confidence() -> Confidence {
    BEHAVIORAL_CONFIDENCE_CAP
}

/// `[sources.behavioral]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralInsightConfig {
    pub baselines: BTreeMap<String, f64>,
    pub effects: Vec<BehavioralEffect>,
}

impl Default for BehavioralInsightConfig {
    fn default() -> Self {
        Self {
            baselines: BTreeMap::new(),
            effects: vec![
                BehavioralEffect {
                    name: "loss_aversion".to_string(),
                    keywords: vec!["cancellation rate".to_string(), "cancel rate".to_string()],
                    baseline: "signup rate".to_string(),
                    multiplier: 1.0 / LOSS_AVERSION_COEFFICIENT,
                    confidence: 0.5,
                    reasoning: "Giving up an owned subscription feels like a loss, so cancellations run below sign-ups"
                        .to_string(),
                },
                BehavioralEffect {
                    name: "anchoring".to_string(),
                    keywords: vec!["willingness to pay".to_string()],
                    baseline: "reference price".to_string(),
                    multiplier: 1.3,
                    confidence: 0.4,
                    reasoning: "A visible premium anchor pulls accepted prices upward".to_string(),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BehavioralInsightSource {
    baselines: BTreeMap<String, f64>,
    effects: Vec<BehavioralEffect>,
}

impl BehavioralInsightSource {
    pub fn new(config: &BehavioralInsightConfig) -> Self {
        Self {
            baselines: config
                .baselines
                .iter()
                .map(|(k, v)| (normalize_key(k), *v))
                .collect(),
            effects: config.effects.clone(),
        }
    }

    pub fn apply(&self, target: &TargetProfile, quantity: &str) -> Vec<BenchmarkCandidate> {
        let key = normalize_key(quantity);

        self.effects
            .iter()
            .filter(|effect| effect.keywords.iter().any(|k| key.contains(&normalize_key(k))))
            .filter_map(|effect| {
                let baseline = *self.baselines.get(&normalize_key(&effect.baseline))?;
                Some(
                    BenchmarkCandidate::for_target(
                        target,
                        effect.name.clone(),
                        baseline * effect.multiplier,
                        format!("behavioral:{}", effect.name),
                        SourceKind::BehavioralInsight,
                    )
                    .with_confidence(effect.confidence.min(BEHAVIORAL_CONFIDENCE_CAP))
                    .with_context("baseline", effect.baseline.as_str())
                    .with_context("baseline_value", baseline)
                    .with_context("multiplier", effect.multiplier)
                    .with_context("reasoning", effect.reasoning.as_str()),
                )
            })
            .collect()
    }
}
