//! Estimation audit document
//!
//! A structured record of how a number was reached. Sections:
//! - **rationale:** why an estimate was needed and what it rests on
//! - **base_data:** adopted candidates
//! - **logic_steps:** caller-supplied reasoning steps
//! - **calculation / verification:** how the value was computed and checked
//! - **rejected:** a bounded sample of rejected candidates with reasons
//! - **comparability_check:** bucket counts (they always sum to the total)
//!
//! Building a document never fails. With zero adopted candidates the base data
//! is empty and the confidence is downgraded by one level.

use crate::aggregator::{format_number, Aggregate, ConvergenceCheck, ErrorRange};
use crate::collector::SourceReport;
use crate::comparability::{ComparabilityCounts, ComparabilityEngine, ComparabilityResult, FilteredCandidates};
use crate::types::{BenchmarkCandidate, CandidateRole, ConfidenceLevel, TargetProfile};
use serde::{Deserialize, Serialize};

/// Most rejected candidates a document keeps (also the default)
pub const MAX_REJECTED_SAMPLE: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseDataEntry {
    pub name: String,
    pub value: f64,
    pub source: String,
    pub role: CandidateRole,
    pub score: f64,
}

impl BaseDataEntry {
    fn from_result(result: &ComparabilityResult) -> Self {
        Self {
            name: result.candidate.name.clone(),
            value: result.candidate.value,
            source: result.candidate.source.clone(),
            role: result.candidate.role,
            score: result.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub name: String,
    pub value: f64,
    pub source: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationDocument {
    id: String,
    description: String,
    target: TargetProfile,
    value: Option<f64>,
    confidence: ConfidenceLevel,
    error_range: Option<ErrorRange>,
    rationale: String,
    base_data: Vec<BaseDataEntry>,
    /// Reference candidates used when nothing was adopted
    reference_data: Vec<BaseDataEntry>,
    logic_steps: Vec<String>,
    calculation: String,
    verification: String,
    rejected: Vec<RejectedEntry>,
    comparability_check: ComparabilityCounts,
    fallback_to_reference: bool,
    convergence: Option<ConvergenceCheck>,
    source_reports: Vec<SourceReport>,
    notes: Vec<String>,
}

impl EstimationDocument {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn target(&self) -> &TargetProfile {
        &self.target
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn confidence(&self) -> ConfidenceLevel {
        self.confidence
    }

    pub fn error_range(&self) -> Option<&ErrorRange> {
        self.error_range.as_ref()
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn base_data(&self) -> &[BaseDataEntry] {
        &self.base_data
    }

    pub fn reference_data(&self) -> &[BaseDataEntry] {
        &self.reference_data
    }

    pub fn logic_steps(&self) -> &[String] {
        &self.logic_steps
    }

    pub fn calculation(&self) -> &str {
        &self.calculation
    }

    pub fn verification(&self) -> &str {
        &self.verification
    }

    pub fn rejected(&self) -> &[RejectedEntry] {
        &self.rejected
    }

    pub fn comparability_check(&self) -> &ComparabilityCounts {
        &self.comparability_check
    }

    pub fn fallback_to_reference(&self) -> bool {
        self.fallback_to_reference
    }

    pub fn convergence(&self) -> Option<&ConvergenceCheck> {
        self.convergence.as_ref()
    }

    pub fn source_reports(&self) -> &[SourceReport] {
        &self.source_reports
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Header fields shared by both construction paths
struct Header<'a> {
    id: &'a str,
    description: &'a str,
    target: &'a TargetProfile,
    logic_steps: &'a [String],
}

/// Assembles documents from classified evidence
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    engine: ComparabilityEngine,
    rejected_sample_size: usize,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new(ComparabilityEngine::default(), MAX_REJECTED_SAMPLE)
    }
}

impl DocumentBuilder {
    /// `rejected_sample_size` is capped at [`MAX_REJECTED_SAMPLE`].
    pub fn new(engine: ComparabilityEngine, rejected_sample_size: usize) -> Self {
        Self {
            engine,
            rejected_sample_size: rejected_sample_size.min(MAX_REJECTED_SAMPLE),
        }
    }

    /// Build a document from raw candidates and a caller-computed value.
    ///
    /// Candidates are classified here. With no adopted candidate the given
    /// confidence drops one level.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_estimation_doc(
        &self,
        id: &str,
        description: &str,
        target: &TargetProfile,
        candidates: &[BenchmarkCandidate],
        logic_steps: &[String],
        final_value: Option<f64>,
        confidence: ConfidenceLevel,
        error_range: Option<ErrorRange>,
    ) -> EstimationDocument {
        let filtered = self.engine.filter_candidates(target, candidates);
        let mut notes = Vec::new();

        let confidence = if filtered.adopt.is_empty() {
            notes.push("No adopted candidates; confidence downgraded".to_string());
            confidence.downgrade()
        } else {
            confidence
        };

        let calculation = match final_value {
            Some(value) => format!("Final value supplied by caller: {}", format_number(value)),
            None => "No final value supplied".to_string(),
        };
        let verification = match (&error_range, final_value) {
            (Some(range), Some(_)) => format!("Range check required: {}", range),
            _ => "Range check required".to_string(),
        };

        let header = Header {
            id,
            description,
            target,
            logic_steps,
        };
        let mut document = self.assemble(&header, &filtered, false, notes);
        document.value = final_value;
        document.confidence = confidence;
        document.error_range = error_range;
        document.calculation = calculation;
        document.verification = verification;
        document
    }

    /// Build a document from a pipeline aggregate; its confidence already
    /// carries every downgrade.
    #[allow(clippy::too_many_arguments)]
    pub fn from_aggregate(
        &self,
        id: &str,
        description: &str,
        target: &TargetProfile,
        logic_steps: &[String],
        filtered: &FilteredCandidates,
        aggregate: &Aggregate,
        source_reports: Vec<SourceReport>,
    ) -> EstimationDocument {
        let header = Header {
            id,
            description,
            target,
            logic_steps,
        };
        let mut document = self.assemble(&header, filtered, aggregate.fallback_to_reference, aggregate.notes.clone());

        document.value = aggregate.value;
        document.confidence = aggregate.confidence;
        document.error_range = aggregate.error_range;
        document.calculation = aggregate.calculation.clone();
        document.verification = verification_text(aggregate);
        document.convergence = Some(aggregate.convergence);
        document.source_reports = source_reports;
        document
    }

    fn assemble(
        &self,
        header: &Header<'_>,
        filtered: &FilteredCandidates,
        fallback: bool,
        notes: Vec<String>,
    ) -> EstimationDocument {
        let base_data: Vec<BaseDataEntry> = filtered.adopt.iter().map(BaseDataEntry::from_result).collect();
        let reference_data = if fallback {
            filtered.reference.iter().map(BaseDataEntry::from_result).collect()
        } else {
            Vec::new()
        };

        let rejected = filtered
            .reject
            .iter()
            .take(self.rejected_sample_size)
            .map(|r| RejectedEntry {
                name: r.candidate.name.clone(),
                value: r.candidate.value,
                source: r.candidate.source.clone(),
                score: r.score,
                reason: r.mismatch_summary(),
            })
            .collect();

        EstimationDocument {
            id: header.id.to_string(),
            description: header.description.to_string(),
            target: header.target.clone(),
            value: None,
            confidence: ConfidenceLevel::Low,
            error_range: None,
            rationale: rationale_text(header.target, filtered, fallback),
            base_data,
            reference_data,
            logic_steps: header.logic_steps.to_vec(),
            calculation: String::new(),
            verification: String::new(),
            rejected,
            comparability_check: filtered.counts(),
            fallback_to_reference: fallback,
            convergence: None,
            source_reports: Vec::new(),
            notes,
        }
    }
}

/// Build a document with the default comparability policy and rejected sample size
#[allow(clippy::too_many_arguments)]
pub fn generate_estimation_doc(
    id: &str,
    description: &str,
    target: &TargetProfile,
    candidates: &[BenchmarkCandidate],
    logic_steps: &[String],
    final_value: Option<f64>,
    confidence: ConfidenceLevel,
    error_range: Option<ErrorRange>,
) -> EstimationDocument {
    DocumentBuilder::default().generate_estimation_doc(
        id,
        description,
        target,
        candidates,
        logic_steps,
        final_value,
        confidence,
        error_range,
    )
}

fn rationale_text(target: &TargetProfile, filtered: &FilteredCandidates, fallback: bool) -> String {
    let counts = filtered.counts();
    let basis = if counts.adopted > 0 {
        format!("inferred from {} adopted comparable(s)", counts.adopted)
    } else if fallback {
        format!(
            "inferred from {} reference candidate(s); no comparable was close enough to adopt",
            counts.referenced
        )
    } else {
        "no admissible comparable was found".to_string()
    };

    format!(
        "No direct measurement available for {} ({}, {}); value {} out of {} candidate(s).",
        target.name, target.product_type, target.consumer_type, basis, counts.total_candidates
    )
}

fn verification_text(aggregate: &Aggregate) -> String {
    let mut checks = Vec::new();

    if let (Some(value), Some(range)) = (aggregate.value, &aggregate.error_range) {
        checks.push(format!("Range check: {} within {}", format_number(value), range));
    }

    let convergence = &aggregate.convergence;
    match convergence.ratio {
        Some(ratio) if convergence.converged => checks.push(format!(
            "Convergence: max/min = {:.2} <= {}",
            ratio, convergence.threshold
        )),
        Some(ratio) => checks.push(format!(
            "Convergence FAILED: max/min = {:.2} > {}; cross-check required",
            ratio, convergence.threshold
        )),
        None if convergence.converged => {}
        None => checks.push("Convergence FAILED: values span zero; cross-check required".to_string()),
    }

    if checks.is_empty() {
        "Nothing to verify".to_string()
    } else {
        checks.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::types::SourceKind;

    fn target() -> TargetProfile {
        TargetProfile::new("Piano subscription", "physical", "B2C").with_price(50000.0)
    }

    fn bench(name: &str, product_type: &str, consumer_type: &str, price: Option<f64>) -> BenchmarkCandidate {
        BenchmarkCandidate::new(name, 10.0, "test", SourceKind::BenchmarkIndex)
            .with_profile(product_type, consumer_type)
            .with_price(price)
    }

    #[test]
    fn test_zero_adopted_downgrades_and_empties_base_data() {
        let candidates = vec![bench("Software", "software", "B2C", Some(10000.0))];
        let doc = generate_estimation_doc(
            "EST_1",
            "monthly subscribers",
            &target(),
            &candidates,
            &["Step 1".to_string()],
            Some(100.0),
            ConfidenceLevel::Medium,
            Some(ErrorRange::relative_to(100.0, 0.2)),
        );

        assert!(doc.base_data().is_empty());
        assert_eq!(doc.confidence(), ConfidenceLevel::Low);
        assert_eq!(doc.value(), Some(100.0));
        assert_eq!(doc.logic_steps().to_vec(), vec!["Step 1".to_string()]);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let candidates = vec![
            bench("Same", "physical", "B2C", Some(45000.0)),
            bench("Close", "hardware", "B2C", None),
            bench("Far", "software", "B2B", Some(1000.0)),
        ];
        let doc = generate_estimation_doc(
            "EST_2",
            "x",
            &target(),
            &candidates,
            &[],
            None,
            ConfidenceLevel::High,
            None,
        );

        let counts = doc.comparability_check();
        assert_eq!(counts.adopted + counts.referenced + counts.rejected, counts.total_candidates);
        assert_eq!(counts.total_candidates, 3);
        assert_eq!(counts.adopted, 1);
        assert_eq!(doc.confidence(), ConfidenceLevel::High, "Adopted evidence keeps confidence");
    }

    #[test]
    fn test_rejected_sample_is_bounded_and_ordered() {
        let candidates: Vec<_> = (0..5)
            .map(|i| bench(&format!("Far {}", i), "software", "B2B", None))
            .collect();
        let doc = generate_estimation_doc("EST_3", "x", &target(), &candidates, &[], None, ConfidenceLevel::Low, None);

        let names: Vec<_> = doc.rejected().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Far 0", "Far 1", "Far 2"]);
        assert_eq!(doc.comparability_check().rejected, 5);
        assert!(doc.rejected()[0].reason.contains("product_type"));
    }

    #[test]
    fn test_rejected_sample_size_is_capped() {
        let builder = DocumentBuilder::new(ComparabilityEngine::default(), 10);
        let candidates: Vec<_> = (0..6)
            .map(|i| bench(&format!("Far {}", i), "software", "B2B", None))
            .collect();
        let doc = builder.generate_estimation_doc("EST_CAP", "x", &target(), &candidates, &[], None, ConfidenceLevel::Low, None);

        assert_eq!(doc.rejected().len(), MAX_REJECTED_SAMPLE);
        assert_eq!(doc.comparability_check().rejected, 6);

        let smaller = DocumentBuilder::new(ComparabilityEngine::default(), 1);
        let doc = smaller.generate_estimation_doc("EST_ONE", "x", &target(), &candidates, &[], None, ConfidenceLevel::Low, None);
        assert_eq!(doc.rejected().len(), 1);
    }

    #[test]
    fn test_from_aggregate_records_fallback() {
        let engine = ComparabilityEngine::default();
        let target = TargetProfile::new("App", "digital", "B2C");
        let candidates = vec![bench("Ref", "digital", "B2C", None), bench("Ref 2", "app", "B2C", None)];
        let filtered = engine.filter_candidates(&target, &candidates);
        let aggregate = Aggregator::default().aggregate(&filtered, false);

        let doc = DocumentBuilder::default().from_aggregate("EST_4", "x", &target, &[], &filtered, &aggregate, Vec::new());
        assert!(doc.fallback_to_reference());
        assert!(doc.base_data().is_empty());
        assert_eq!(doc.reference_data().len(), 2);
        assert!(doc.rationale().contains("reference"));
        assert_eq!(doc.confidence(), aggregate.confidence, "No second downgrade");
    }

    #[test]
    fn test_to_json_contains_sections() {
        let doc = generate_estimation_doc("EST_5", "x", &target(), &[], &[], None, ConfidenceLevel::Medium, None);
        let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        for section in ["rationale", "base_data", "logic_steps", "calculation", "verification", "rejected", "comparability_check"] {
            assert!(json.get(section).is_some(), "missing section {}", section);
        }
        assert_eq!(json["confidence"], "Low");
    }
}
