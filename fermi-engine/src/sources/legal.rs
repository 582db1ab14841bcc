//! Legal norms: statutory fixed values
//!
//! Minimum wages, working-hour caps and similar values fixed by law. A norm
//! matches when the normalized quantity equals its key or one of its aliases.

use crate::types::{normalize_key, BenchmarkCandidate, SourceKind, TargetProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalNorm {
    pub key: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub value: f64,
    pub unit: String,
    pub jurisdiction: String,
    /// Statute or regulation the value comes from
    pub statute: String,
    #[serde(default)]
    pub effective_year: Option<i32>,
}

impl LegalNorm {
    fn matches(&self, key: &str) -> bool {
        normalize_key(&self.key) == key || self.aliases.iter().any(|a| normalize_key(a) == key)
    }
}

/// `[sources.legal]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegalNormConfig {
    pub norms: Vec<LegalNorm>,
}

impl Default for LegalNormConfig {
    fn default() -> Self {
        Self {
            norms: vec![
                LegalNorm {
                    key: "minimum hourly wage".to_string(),
                    aliases: vec!["minimum wage".to_string(), "hourly minimum wage".to_string()],
                    value: 9860.0,
                    unit: "KRW/hour".to_string(),
                    jurisdiction: "KR".to_string(),
                    statute: "Minimum Wage Act (2024 notice)".to_string(),
                    effective_year: Some(2024),
                },
                LegalNorm {
                    key: "maximum weekly working hours".to_string(),
                    aliases: vec!["max weekly hours".to_string(), "weekly working hour cap".to_string()],
                    value: 52.0,
                    unit: "hours/week".to_string(),
                    jurisdiction: "KR".to_string(),
                    statute: "Labor Standards Act art. 53".to_string(),
                    effective_year: Some(2018),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LegalNormSource {
    norms: Vec<LegalNorm>,
}

impl LegalNormSource {
    pub fn new(config: &LegalNormConfig) -> Self {
        Self {
            norms: config.norms.clone(),
        }
    }

    pub fn lookup(&self, target: &TargetProfile, quantity: &str) -> Vec<BenchmarkCandidate> {
        let key = normalize_key(quantity);
        self.norms
            .iter()
            .filter(|norm| norm.matches(&key))
            .map(|norm| {
                let mut candidate = BenchmarkCandidate::for_target(
                    target,
                    norm.key.clone(),
                    norm.value,
                    norm.statute.clone(),
                    SourceKind::LegalNorm,
                )
                .with_confidence(1.0)
                .with_context("unit", norm.unit.as_str())
                .with_context("jurisdiction", norm.jurisdiction.as_str());
                if let Some(year) = norm.effective_year {
                    candidate = candidate.with_context("effective_year", year);
                }
                candidate
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_match() {
        let source = LegalNormSource::new(&LegalNormConfig::default());
        let target = TargetProfile::new("Cafe staffing", "service", "B2C");

        let candidates = source.lookup(&target, "Minimum wage");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].value, 9860.0);
        assert_eq!(candidates[0].source_kind, SourceKind::LegalNorm);
        assert_eq!(candidates[0].context["jurisdiction"], "KR");
    }

    #[test]
    fn test_unrelated_quantity_yields_nothing() {
        let source = LegalNormSource::new(&LegalNormConfig::default());
        let target = TargetProfile::new("Cafe staffing", "service", "B2C");
        assert!(source.lookup(&target, "average wage").is_empty());
    }
}
