//! Comparability Engine
//!
//! Scores each candidate against the target on four axes and classifies it:
//!
//! | Criterion        | Identical | Similar | Different |
//! |------------------|-----------|---------|-----------|
//! | product type     | +1.0      | +0.5    | 0         |
//! | consumer type    | +1.0      | -       | 0         |
//! | price ratio      | +1.0      | +0.5    | 0         |
//! | purchase context | +1.0      | -       | 0         |
//!
//! The price axis is skipped when either side has no usable price, so its
//! absence is never a penalty. Scores are kept as untruncated floats and the
//! thresholds apply to the float: `>= 3.5` adopt, `>= 2.5` reference, else reject.
//!
//! Scoring is pure: the same target and candidate always produce the same result.

use crate::types::{BenchmarkCandidate, Decision, TargetProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Policy
// ============================================================================

/// Thresholds and similarity groups used for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparabilityPolicy {
    /// Minimum score for Adopt
    pub adopt_threshold: f64,
    /// Minimum score for Reference
    pub reference_threshold: f64,
    /// Price ratio (max/min) scored as identical
    pub same_price_ratio: f64,
    /// Price ratio (max/min) scored as similar
    pub similar_price_ratio: f64,
    /// Product types considered similar to each other (lowercase)
    pub similarity_groups: Vec<Vec<String>>,
}

impl Default for ComparabilityPolicy {
    fn default() -> Self {
        let group = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            adopt_threshold: 3.5,
            reference_threshold: 2.5,
            same_price_ratio: 1.5,
            similar_price_ratio: 3.0,
            similarity_groups: vec![
                group(&["physical", "hardware", "device"]),
                group(&["digital", "software", "app"]),
                group(&["service", "platform"]),
            ],
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Scoring axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    ProductType,
    ConsumerType,
    Price,
    PurchaseContext,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::ProductType => "product_type",
            Criterion::ConsumerType => "consumer_type",
            Criterion::Price => "price",
            Criterion::PurchaseContext => "purchase_context",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome on a single axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Identical,
    Similar,
    Different,
    /// Axis skipped (price missing on either side)
    NotAvailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionDetail {
    pub verdict: Verdict,
    pub points: f64,
    pub note: String,
}

/// Result of scoring one candidate against the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparabilityResult {
    pub candidate: BenchmarkCandidate,
    pub score: f64,
    pub decision: Decision,
    /// Human-readable reasons, one per axis that was evaluated
    pub reasons: Vec<String>,
    pub details: BTreeMap<Criterion, CriterionDetail>,
}

impl ComparabilityResult {
    /// One-line explanation listing the axes that did not match
    pub fn mismatch_summary(&self) -> String {
        let mismatches: Vec<String> = self
            .details
            .iter()
            .filter(|(_, d)| matches!(d.verdict, Verdict::Different | Verdict::Similar))
            .map(|(c, d)| format!("{}: {}", c, d.note))
            .collect();

        if mismatches.is_empty() {
            format!("score {:.1}", self.score)
        } else {
            format!("score {:.1} ({})", self.score, mismatches.join("; "))
        }
    }
}

/// Bucket counts for the audit document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparabilityCounts {
    pub adopted: usize,
    pub referenced: usize,
    pub rejected: usize,
    pub total_candidates: usize,
}

/// Candidates partitioned by decision, each bucket in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredCandidates {
    pub adopt: Vec<ComparabilityResult>,
    pub reference: Vec<ComparabilityResult>,
    pub reject: Vec<ComparabilityResult>,
}

impl FilteredCandidates {
    pub fn total(&self) -> usize {
        self.adopt.len() + self.reference.len() + self.reject.len()
    }

    pub fn counts(&self) -> ComparabilityCounts {
        ComparabilityCounts {
            adopted: self.adopt.len(),
            referenced: self.reference.len(),
            rejected: self.reject.len(),
            total_candidates: self.total(),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ComparabilityEngine {
    policy: ComparabilityPolicy,
}

impl ComparabilityEngine {
    pub fn new(policy: ComparabilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ComparabilityPolicy {
        &self.policy
    }

    /// Score a single candidate against the target
    pub fn check_comparability(
        &self,
        target: &TargetProfile,
        candidate: &BenchmarkCandidate,
    ) -> ComparabilityResult {
        let mut details = BTreeMap::new();
        let mut reasons = Vec::new();
        let mut score = 0.0;

        // 1. Product type
        let detail = self.score_product_type(&target.product_type, &candidate.product_type);
        score += detail.points;
        reasons.push(format!("product type {}", detail.note));
        details.insert(Criterion::ProductType, detail);

        // 2. Consumer type
        let detail = score_consumer_type(&target.consumer_type, &candidate.consumer_type);
        score += detail.points;
        reasons.push(format!("consumer type {}", detail.note));
        details.insert(Criterion::ConsumerType, detail);

        // 3. Price (skipped when unavailable)
        let detail = self.score_price(target.price, candidate.price);
        if detail.verdict != Verdict::NotAvailable {
            score += detail.points;
            reasons.push(format!("price {}", detail.note));
        }
        details.insert(Criterion::Price, detail);

        // 4. Purchase context
        let detail = score_purchase_context(target.is_essential, candidate.is_essential);
        score += detail.points;
        reasons.push(format!("purchase context {}", detail.note));
        details.insert(Criterion::PurchaseContext, detail);

        ComparabilityResult {
            candidate: candidate.clone(),
            score,
            decision: self.decide(score),
            reasons,
            details,
        }
    }

    /// Score and partition a candidate list; every input lands in exactly one bucket
    pub fn filter_candidates(
        &self,
        target: &TargetProfile,
        candidates: &[BenchmarkCandidate],
    ) -> FilteredCandidates {
        let mut filtered = FilteredCandidates::default();

        for candidate in candidates {
            let result = self.check_comparability(target, candidate);
            tracing::debug!(
                candidate = %candidate.name,
                score = result.score,
                decision = %result.decision,
                "Scored candidate"
            );
            match result.decision {
                Decision::Adopt => filtered.adopt.push(result),
                Decision::Reference => filtered.reference.push(result),
                Decision::Reject => filtered.reject.push(result),
            }
        }

        filtered
    }

    /// Map a score onto a decision using the policy thresholds
    pub fn decide(&self, score: f64) -> Decision {
        if score >= self.policy.adopt_threshold {
            Decision::Adopt
        } else if score >= self.policy.reference_threshold {
            Decision::Reference
        } else {
            Decision::Reject
        }
    }

    fn score_product_type(&self, target: &str, candidate: &str) -> CriterionDetail {
        let a = target.trim().to_lowercase();
        let b = candidate.trim().to_lowercase();

        if a == b {
            CriterionDetail {
                verdict: Verdict::Identical,
                points: 1.0,
                note: format!("identical ({})", a),
            }
        } else if self.same_group(&a, &b) {
            CriterionDetail {
                verdict: Verdict::Similar,
                points: 0.5,
                note: format!("similar ({} vs {})", a, b),
            }
        } else {
            CriterionDetail {
                verdict: Verdict::Different,
                points: 0.0,
                note: format!("different ({} vs {})", a, b),
            }
        }
    }

    fn same_group(&self, a: &str, b: &str) -> bool {
        self.policy.similarity_groups.iter().any(|group| {
            group.iter().any(|g| g.eq_ignore_ascii_case(a)) && group.iter().any(|g| g.eq_ignore_ascii_case(b))
        })
    }

    fn score_price(&self, target: Option<f64>, candidate: Option<f64>) -> CriterionDetail {
        let (a, b) = match (usable_price(target), usable_price(candidate)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return CriterionDetail {
                    verdict: Verdict::NotAvailable,
                    points: 0.0,
                    note: "not available".to_string(),
                }
            }
        };

        let ratio = a.max(b) / a.min(b);
        if ratio <= self.policy.same_price_ratio {
            CriterionDetail {
                verdict: Verdict::Identical,
                points: 1.0,
                note: format!("similar band (ratio {:.2})", ratio),
            }
        } else if ratio <= self.policy.similar_price_ratio {
            CriterionDetail {
                verdict: Verdict::Similar,
                points: 0.5,
                note: format!("some difference (ratio {:.2})", ratio),
            }
        } else {
            CriterionDetail {
                verdict: Verdict::Different,
                points: 0.0,
                note: format!("large gap (ratio {:.2})", ratio),
            }
        }
    }
}

fn usable_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

fn score_consumer_type(target: &str, candidate: &str) -> CriterionDetail {
    let a = target.trim();
    let b = candidate.trim();
    if a.eq_ignore_ascii_case(b) {
        CriterionDetail {
            verdict: Verdict::Identical,
            points: 1.0,
            note: format!("identical ({})", a),
        }
    } else {
        CriterionDetail {
            verdict: Verdict::Different,
            points: 0.0,
            note: format!("different ({} vs {})", a, b),
        }
    }
}

fn score_purchase_context(target: bool, candidate: bool) -> CriterionDetail {
    let label = |essential: bool| if essential { "essential" } else { "discretionary" };
    if target == candidate {
        CriterionDetail {
            verdict: Verdict::Identical,
            points: 1.0,
            note: format!("identical ({})", label(target)),
        }
    } else {
        CriterionDetail {
            verdict: Verdict::Different,
            points: 0.0,
            note: format!("different ({} vs {})", label(target), label(candidate)),
        }
    }
}
