//! Physical and mathematical constraints
//!
//! Produces lower/upper bound candidates: a day has 24 hours, a probability
//! lies in [0, 1], money and counts are non-negative. Per-actor limits scale
//! with the actor population when it is configured; without it only the
//! per-actor lower bound is emitted.
//!
//! This source never fails. A quantity with no matching rule yields nothing.

use crate::types::{normalize_key, BenchmarkCandidate, CandidateRole, SourceKind, TargetProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRule {
    pub name: String,
    /// Any keyword contained in the quantity triggers the rule
    pub keywords: Vec<String>,
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
    /// Upper bound applies per actor and scales with the population
    #[serde(default)]
    pub per_actor: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl ConstraintRule {
    fn new(name: &str, keywords: &[&str], lower: Option<f64>, upper: Option<f64>, reasoning: &str) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            lower,
            upper,
            per_actor: false,
            reasoning: reasoning.to_string(),
        }
    }

    fn per_actor(mut self) -> Self {
        self.per_actor = true;
        self
    }

    fn matches(&self, key: &str) -> bool {
        self.keywords.iter().any(|k| key.contains(&normalize_key(k)))
    }
}

/// `[sources.constraints]` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstraintConfig {
    pub rules: Vec<ConstraintRule>,
    /// Number of actors (people, machines) sharing per-actor limits
    pub actor_population: Option<f64>,
}

impl Default for PhysicalConstraintConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                ConstraintRule::new(
                    "hours_per_day",
                    &["hours per day", "hours a day", "daily hours"],
                    Some(0.0),
                    Some(24.0),
                    "A day has 24 hours",
                )
                .per_actor(),
                ConstraintRule::new(
                    "hours_per_week",
                    &["hours per week", "hours a week", "weekly hours"],
                    Some(0.0),
                    Some(168.0),
                    "A week has 168 hours",
                )
                .per_actor(),
                ConstraintRule::new(
                    "probability",
                    &["probability", "likelihood", "chance of"],
                    Some(0.0),
                    Some(1.0),
                    "Probabilities lie in [0, 1]",
                ),
                ConstraintRule::new(
                    "fraction",
                    &["conversion rate", "churn rate", "retention rate", "market share", "penetration"],
                    Some(0.0),
                    Some(1.0),
                    "Rates and shares are fractions of a whole",
                ),
                ConstraintRule::new(
                    "non_negative",
                    &["revenue", "cost", "price", "number of", "count", "users", "customers", "market size"],
                    Some(0.0),
                    None,
                    "Money and counts cannot be negative",
                ),
            ],
            actor_population: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PhysicalConstraintSource {
    config: PhysicalConstraintConfig,
}

impl PhysicalConstraintSource {
    pub fn new(config: &PhysicalConstraintConfig) -> Self {
        Self { config: config.clone() }
    }

    pub fn bounds(&self, target: &TargetProfile, quantity: &str) -> Vec<BenchmarkCandidate> {
        let key = normalize_key(quantity);
        let mut candidates = Vec::new();

        for rule in self.config.rules.iter().filter(|r| r.matches(&key)) {
            if let Some(lower) = rule.lower {
                candidates.push(self.bound(target, rule, lower, CandidateRole::LowerBound));
            }

            let upper = match (rule.upper, rule.per_actor, self.config.actor_population) {
                (Some(upper), false, _) => Some(upper),
                (Some(upper), true, Some(population)) if population.is_finite() && population > 0.0 => {
                    Some(upper * population)
                }
                _ => None,
            };
            if let Some(upper) = upper {
                candidates.push(self.bound(target, rule, upper, CandidateRole::UpperBound));
            }
        }

        candidates
    }

    fn bound(&self, target: &TargetProfile, rule: &ConstraintRule, value: f64, role: CandidateRole) -> BenchmarkCandidate {
        let side = if role == CandidateRole::LowerBound { "lower" } else { "upper" };
        BenchmarkCandidate::for_target(
            target,
            format!("{} {} bound", rule.name, side),
            value,
            "physical law",
            SourceKind::PhysicalConstraint,
        )
        .with_role(role)
        .with_confidence(1.0)
        .with_context("rule", rule.name.as_str())
        .with_context("reasoning", rule.reasoning.as_str())
    }
}
