//! Core Types for the Fermi Estimation Engine
//!
//! Shared vocabulary for the evidence pipeline:
//! - **TargetProfile:** the entity being estimated (caller-owned, immutable)
//! - **BenchmarkCandidate:** one piece of evidence produced by an evidence source
//! - **SourceKind / CandidateRole:** provenance and how a value may be used
//! - **Decision / ConfidenceLevel:** admissibility and confidence labels
//!
//! Comparability-relevant attributes (product type, consumer type, price,
//! purchase context) are first-class fields. The free-form `context` map carries
//! provenance metadata only and is never consulted by the comparability engine.

use crate::error::EstimationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Confidence score (0.0-1.0)
pub type Confidence = f64;

/// Typed, extensible attribute map for non-comparability metadata
pub type ContextMap = BTreeMap<String, serde_json::Value>;

// ============================================================================
// Target Profile
// ============================================================================

/// The entity whose quantity is being estimated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProfile {
    /// Human-readable name (e.g., "Piano subscription service")
    pub name: String,
    /// physical / digital / service, or a more specific type (hardware, app, platform...)
    pub product_type: String,
    /// B2C / B2B / B2G
    pub consumer_type: String,
    /// Unit price (optional; 0 means free and is treated as no price)
    #[serde(default)]
    pub price: Option<f64>,
    /// Necessity (true) vs discretionary purchase (false)
    #[serde(default)]
    pub is_essential: bool,
}

impl TargetProfile {
    pub fn new(
        name: impl Into<String>,
        product_type: impl Into<String>,
        consumer_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            product_type: product_type.into(),
            consumer_type: consumer_type.into(),
            price: None,
            is_essential: false,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn essential(mut self, is_essential: bool) -> Self {
        self.is_essential = is_essential;
        self
    }

    /// Copy with a zero price cleared, so a free product skips the price axis
    pub fn normalized(&self) -> Self {
        let mut target = self.clone();
        target.price = target.price.filter(|p| *p != 0.0);
        target
    }

    /// Check the caller contract: required fields present, price usable.
    ///
    /// This is the only fail-fast condition of an estimation request and runs
    /// before any evidence source is queried.
    pub fn validate(&self) -> Result<(), EstimationError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.product_type.trim().is_empty() {
            missing.push("product_type");
        }
        if self.consumer_type.trim().is_empty() {
            missing.push("consumer_type");
        }
        if !missing.is_empty() {
            return Err(EstimationError::MalformedTarget(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(EstimationError::MalformedTarget(format!(
                    "price must be a non-negative finite number, got {}",
                    price
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Source Kinds
// ============================================================================

/// Closed set of evidence source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Exact in-project lookup (confidence 1.0)
    DefiniteData,
    /// Hard bounds from physical or mathematical laws
    PhysicalConstraint,
    /// Statutory fixed values
    LegalNorm,
    /// Distributional patterns applied to a known aggregate
    StatisticalHeuristic,
    /// Behavioral-economics adjustments to a baseline
    BehavioralInsight,
    /// Generative-model guess with calibrated confidence
    AiAugmented,
    /// Rule-of-thumb catalog lookup
    BenchmarkIndex,
    /// Numeric aggregates from maintained registries
    StructuredDataset,
}

impl SourceKind {
    pub const ALL: [SourceKind; 8] = [
        SourceKind::DefiniteData,
        SourceKind::PhysicalConstraint,
        SourceKind::LegalNorm,
        SourceKind::StatisticalHeuristic,
        SourceKind::BehavioralInsight,
        SourceKind::AiAugmented,
        SourceKind::BenchmarkIndex,
        SourceKind::StructuredDataset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::DefiniteData => "definite_data",
            SourceKind::PhysicalConstraint => "physical_constraint",
            SourceKind::LegalNorm => "legal_norm",
            SourceKind::StatisticalHeuristic => "statistical_heuristic",
            SourceKind::BehavioralInsight => "behavioral_insight",
            SourceKind::AiAugmented => "ai_augmented",
            SourceKind::BenchmarkIndex => "benchmark_index",
            SourceKind::StructuredDataset => "structured_dataset",
        }
    }

    /// Upper bound on the confidence hint a source of this kind may attach
    pub fn confidence_cap(&self) -> Confidence {
        match self {
            SourceKind::DefiniteData | SourceKind::PhysicalConstraint | SourceKind::LegalNorm => 1.0,
            SourceKind::StructuredDataset => 0.95,
            SourceKind::BenchmarkIndex => 0.8,
            SourceKind::AiAugmented => 0.7,
            SourceKind::StatisticalHeuristic => 0.6,
            SourceKind::BehavioralInsight => 0.5,
        }
    }

    /// Whether queries leave the process (network or model calls)
    pub fn is_remote(&self) -> bool {
        matches!(self, SourceKind::AiAugmented)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a candidate value may be used by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRole {
    /// A point value for the quantity
    #[default]
    Point,
    /// The quantity cannot be below this value
    LowerBound,
    /// The quantity cannot exceed this value
    UpperBound,
}

impl CandidateRole {
    pub fn is_bound(&self) -> bool {
        !matches!(self, CandidateRole::Point)
    }
}

// ============================================================================
// Benchmark Candidate
// ============================================================================

/// One piece of evidence produced by an evidence source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkCandidate {
    pub name: String,
    pub value: f64,
    pub product_type: String,
    pub consumer_type: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub is_essential: bool,
    /// Provenance identifier (dataset id, statute, model name...)
    pub source: String,
    pub source_kind: SourceKind,
    #[serde(default)]
    pub role: CandidateRole,
    /// Intrinsic confidence hint (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub confidence: Confidence,
    #[serde(default)]
    pub context: ContextMap,
}

fn default_confidence() -> Confidence {
    1.0
}

impl BenchmarkCandidate {
    /// Candidate with unknown profile attributes
    pub fn new(
        name: impl Into<String>,
        value: f64,
        source: impl Into<String>,
        source_kind: SourceKind,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            product_type: "unknown".to_string(),
            consumer_type: "unknown".to_string(),
            price: None,
            is_essential: false,
            source: source.into(),
            source_kind,
            role: CandidateRole::Point,
            confidence: source_kind.confidence_cap(),
            context: ContextMap::new(),
        }
    }

    /// Candidate describing the target itself (laws, project data, model guesses):
    /// it inherits the target's comparability attributes.
    pub fn for_target(
        target: &TargetProfile,
        name: impl Into<String>,
        value: f64,
        source: impl Into<String>,
        source_kind: SourceKind,
    ) -> Self {
        Self {
            product_type: target.product_type.clone(),
            consumer_type: target.consumer_type.clone(),
            price: target.price,
            is_essential: target.is_essential,
            ..Self::new(name, value, source, source_kind)
        }
    }

    pub fn with_profile(
        mut self,
        product_type: impl Into<String>,
        consumer_type: impl Into<String>,
    ) -> Self {
        self.product_type = product_type.into();
        self.consumer_type = consumer_type.into();
        self
    }

    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.price = price;
        self
    }

    pub fn essential(mut self, is_essential: bool) -> Self {
        self.is_essential = is_essential;
        self
    }

    pub fn with_role(mut self, role: CandidateRole) -> Self {
        self.role = role;
        self
    }

    /// Set the confidence hint, clamped to [0, cap of the source kind]
    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        let cap = self.source_kind.confidence_cap();
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, cap)
        } else {
            0.0
        };
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Evidence admissibility decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Primary evidence
    Adopt,
    /// Usable only as fallback
    Reference,
    /// Not comparable
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Adopt => "adopt",
            Decision::Reference => "reference",
            Decision::Reject => "reject",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence label of a final estimate (ordered Low < Medium < High)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// One level down, saturating at Low
    pub fn downgrade(self) -> Self {
        match self {
            ConfidenceLevel::High => ConfidenceLevel::Medium,
            ConfidenceLevel::Medium | ConfidenceLevel::Low => ConfidenceLevel::Low,
        }
    }

    /// Map a mean confidence hint onto a label (>= 0.8 High, >= 0.5 Medium)
    pub fn from_score(score: Confidence) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a free-text quantity description into a lookup key
/// (lowercase, single spaces, trailing punctuation removed).
pub fn normalize_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, '?' | '.' | ',' | '!' | ':' | ';'))
        .trim()
        .to_lowercase()
}

// ============================================================================
// Tests
// ============================================================================
