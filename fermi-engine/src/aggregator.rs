//! Evidence aggregation
//!
//! Combines admissible candidates into a final value:
//! 1. Point values come from the Adopt bucket; when it holds none, the
//!    Reference bucket is used instead and the fallback is recorded.
//! 2. Hard bounds (lower/upper bound candidates from either bucket) clip the
//!    central value and the error range. They never enter the central tendency.
//! 3. Convergence is checked over the point values (max/min against the
//!    configured ratio, 1.3 by default).
//! 4. Confidence starts from the mean confidence hint of the used points and
//!    drops one level for each of: fewer than two adopted points (or the
//!    fallback, which implies it), a failed or timed-out source, and
//!    non-convergent evidence.

use crate::comparability::{ComparabilityResult, FilteredCandidates};
use crate::types::{BenchmarkCandidate, CandidateRole, ConfidenceLevel};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// How the point values are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralTendency {
    #[default]
    Median,
    Mean,
    ConfidenceWeightedMean,
}

impl CentralTendency {
    pub fn as_str(&self) -> &'static str {
        match self {
            CentralTendency::Median => "median",
            CentralTendency::Mean => "mean",
            CentralTendency::ConfidenceWeightedMean => "confidence-weighted mean",
        }
    }
}

/// Aggregation settings (`[aggregation]` config section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationPolicy {
    pub central_tendency: CentralTendency,
    /// Maximum max/min ratio still considered convergent
    pub convergence_threshold: f64,
    /// Minimum relative error band per confidence tier
    pub high_band: f64,
    pub medium_band: f64,
    pub low_band: f64,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            central_tendency: CentralTendency::Median,
            convergence_threshold: 1.3,
            high_band: 0.10,
            medium_band: 0.20,
            low_band: 0.30,
        }
    }
}

impl AggregationPolicy {
    pub fn band_floor(&self, level: ConfidenceLevel) -> f64 {
        match level {
            ConfidenceLevel::High => self.high_band,
            ConfidenceLevel::Medium => self.medium_band,
            ConfidenceLevel::Low => self.low_band,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceCheck {
    /// max/min over the point values; None when it cannot be computed
    pub ratio: Option<f64>,
    pub threshold: f64,
    pub converged: bool,
}

/// Error band around a final value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorRange {
    pub lower: f64,
    pub upper: f64,
    /// Relative half-width (0.2 = ±20%)
    pub relative: f64,
}

impl ErrorRange {
    /// Symmetric band of `relative` around `value`
    pub fn relative_to(value: f64, relative: f64) -> Self {
        let half = value.abs() * relative;
        Self {
            lower: value - half,
            upper: value + half,
            relative,
        }
    }
}

impl fmt::Display for ErrorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "±{:.0}% [{} .. {}]",
            self.relative * 100.0,
            format_number(self.lower),
            format_number(self.upper)
        )
    }
}

/// Output of aggregation, consumed by the document builder
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub value: Option<f64>,
    pub confidence: ConfidenceLevel,
    pub error_range: Option<ErrorRange>,
    pub convergence: ConvergenceCheck,
    pub fallback_to_reference: bool,
    /// Number of point values that entered the central tendency
    pub evidence_count: usize,
    pub calculation: String,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    lower: Option<f64>,
    upper: Option<f64>,
}

impl Bounds {
    fn clip(&self, value: f64) -> f64 {
        let value = self.lower.map_or(value, |lo| value.max(lo));
        self.upper.map_or(value, |hi| value.min(hi))
    }

    fn is_empty(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    policy: AggregationPolicy,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AggregationPolicy {
        &self.policy
    }

    /// Aggregate classified evidence into a final value with confidence and range
    pub fn aggregate(&self, filtered: &FilteredCandidates, source_failed: bool) -> Aggregate {
        let mut notes = Vec::new();

        let adopted_points = points(&filtered.adopt);
        let (used, fallback) = if adopted_points.is_empty() {
            let reference_points = points(&filtered.reference);
            if reference_points.is_empty() {
                (Vec::new(), false)
            } else {
                notes.push(format!(
                    "No adopted point evidence; fell back to {} reference candidate(s)",
                    reference_points.len()
                ));
                (reference_points, true)
            }
        } else {
            (adopted_points, false)
        };

        let bounds = self.collect_bounds(filtered, &mut notes);
        let values: Vec<f64> = used.iter().map(|c| c.value).collect();
        let convergence = self.check_convergence(&values);

        // No point evidence: derive from bounds or give up
        if used.is_empty() {
            return self.without_points(bounds, convergence, notes);
        }

        let raw = self.central_value(&used);
        let value = bounds.clip(raw);
        let mut calculation = format!(
            "{} of {} value(s) [{}] = {}",
            self.policy.central_tendency.as_str(),
            values.len(),
            values.iter().map(|v| format_number(*v)).collect::<Vec<_>>().join(", "),
            format_number(raw)
        );
        if value != raw {
            calculation.push_str(&format!("; clipped to hard bounds = {}", format_number(value)));
        }

        // Confidence: base tier from the evidence, then one step per trigger
        let mean_hint = used.iter().map(|c| c.confidence).sum::<f64>() / used.len() as f64;
        let mut confidence = ConfidenceLevel::from_score(mean_hint);
        if fallback {
            confidence = confidence.downgrade();
            notes.push("Confidence downgraded: reference fallback".to_string());
        } else if used.len() < 2 {
            confidence = confidence.downgrade();
            notes.push("Confidence downgraded: fewer than two adopted candidates".to_string());
        }
        if source_failed {
            confidence = confidence.downgrade();
            notes.push("Confidence downgraded: at least one source failed or timed out".to_string());
        }
        if !convergence.converged {
            confidence = confidence.downgrade();
            notes.push(format!(
                "Confidence downgraded: evidence did not converge (ratio {} > {})",
                convergence.ratio.map_or_else(|| "n/a".to_string(), |r| format!("{:.2}", r)),
                convergence.threshold
            ));
        }

        let error_range = self.error_range(value, &values, confidence, bounds);

        debug!(
            value,
            confidence = %confidence,
            points = used.len(),
            fallback,
            converged = convergence.converged,
            "Aggregated evidence"
        );

        Aggregate {
            value: Some(value),
            confidence,
            error_range: Some(error_range),
            convergence,
            fallback_to_reference: fallback,
            evidence_count: used.len(),
            calculation,
            notes,
        }
    }

    /// Convergence over point values.
    ///
    /// A single value converges. A non-positive minimum makes the ratio
    /// meaningless, so such sets converge only when all values are equal.
    pub fn check_convergence(&self, values: &[f64]) -> ConvergenceCheck {
        let threshold = self.policy.convergence_threshold;
        if values.is_empty() {
            return ConvergenceCheck {
                ratio: None,
                threshold,
                converged: true,
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if min <= 0.0 {
            return ConvergenceCheck {
                ratio: None,
                threshold,
                converged: min == max,
            };
        }

        let ratio = max / min;
        ConvergenceCheck {
            ratio: Some(ratio),
            threshold,
            converged: ratio <= threshold,
        }
    }

    fn central_value(&self, used: &[&BenchmarkCandidate]) -> f64 {
        let values: Vec<f64> = used.iter().map(|c| c.value).collect();
        match self.policy.central_tendency {
            CentralTendency::Median => median(&values).unwrap_or(0.0),
            CentralTendency::Mean => values.iter().sum::<f64>() / values.len() as f64,
            CentralTendency::ConfidenceWeightedMean => {
                let total_weight: f64 = used.iter().map(|c| c.confidence).sum();
                if total_weight <= 0.0 {
                    values.iter().sum::<f64>() / values.len() as f64
                } else {
                    used.iter().map(|c| c.value * c.confidence).sum::<f64>() / total_weight
                }
            }
        }
    }

    fn collect_bounds(&self, filtered: &FilteredCandidates, notes: &mut Vec<String>) -> Bounds {
        let admissible = filtered.adopt.iter().chain(filtered.reference.iter()).map(|r| &r.candidate);

        let mut lower: Option<f64> = None;
        let mut upper: Option<f64> = None;
        for candidate in admissible {
            match candidate.role {
                CandidateRole::LowerBound => {
                    lower = Some(lower.map_or(candidate.value, |lo| lo.max(candidate.value)));
                }
                CandidateRole::UpperBound => {
                    upper = Some(upper.map_or(candidate.value, |hi| hi.min(candidate.value)));
                }
                CandidateRole::Point => {}
            }
        }

        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo > hi {
                notes.push(format!(
                    "Inconsistent hard bounds (lower {} > upper {}); bounds ignored",
                    format_number(lo),
                    format_number(hi)
                ));
                return Bounds { lower: None, upper: None };
            }
        }

        Bounds { lower, upper }
    }

    fn without_points(&self, bounds: Bounds, convergence: ConvergenceCheck, mut notes: Vec<String>) -> Aggregate {
        if let (Some(lo), Some(hi)) = (bounds.lower, bounds.upper) {
            let value = (lo + hi) / 2.0;
            notes.push("No point evidence; value is the midpoint of the hard bounds".to_string());
            let relative = if value != 0.0 { (hi - value) / value.abs() } else { 0.0 };
            return Aggregate {
                value: Some(value),
                confidence: ConfidenceLevel::Low,
                error_range: Some(ErrorRange {
                    lower: lo,
                    upper: hi,
                    relative,
                }),
                convergence,
                fallback_to_reference: false,
                evidence_count: 0,
                calculation: format!(
                    "midpoint of hard bounds [{} .. {}] = {}",
                    format_number(lo),
                    format_number(hi),
                    format_number(value)
                ),
                notes,
            };
        }

        if !bounds.is_empty() {
            notes.push("Only a one-sided hard bound is available; no value derived".to_string());
        }
        notes.push("No admissible evidence".to_string());
        Aggregate {
            value: None,
            confidence: ConfidenceLevel::Low,
            error_range: None,
            convergence,
            fallback_to_reference: false,
            evidence_count: 0,
            calculation: "no admissible evidence; no value computed".to_string(),
            notes,
        }
    }

    /// Relative band = max(observed spread, tier floor), clipped to the bounds
    fn error_range(&self, value: f64, values: &[f64], level: ConfidenceLevel, bounds: Bounds) -> ErrorRange {
        let floor = self.policy.band_floor(level);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let spread = if value != 0.0 {
            (value - min).max(max - value).max(0.0) / value.abs()
        } else {
            0.0
        };
        let relative = spread.max(floor);

        let range = ErrorRange::relative_to(value, relative);
        ErrorRange {
            lower: bounds.clip(range.lower.min(min)),
            upper: bounds.clip(range.upper.max(max)),
            relative,
        }
    }
}

fn points(bucket: &[ComparabilityResult]) -> Vec<&BenchmarkCandidate> {
    bucket
        .iter()
        .map(|r| &r.candidate)
        .filter(|c| c.role == CandidateRole::Point && c.value.is_finite())
        .collect()
}

/// Median of a slice (mean of the two middle values for even lengths)
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Compact number rendering for audit text (no trailing zeros)
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.4}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
