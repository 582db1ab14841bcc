//! Comparability scoring and document assembly tests
//!
//! Worked examples: a physical B2C subscription (price 50,000, discretionary)
//! compared against a physical B2C essential product and a B2B software tool.

use fermi_engine::comparability::{Criterion, Verdict};
use fermi_engine::{
    generate_estimation_doc, BenchmarkCandidate, ComparabilityEngine, ConfidenceLevel, Decision,
    ErrorRange, SourceKind, TargetProfile,
};

fn subscription_target() -> TargetProfile {
    TargetProfile::new("Piano subscription", "physical", "B2C")
        .with_price(50000.0)
        .essential(false)
}

fn candidate(name: &str, product_type: &str, consumer_type: &str, price: f64, essential: bool) -> BenchmarkCandidate {
    BenchmarkCandidate::new(name, 1000.0, "industry report", SourceKind::BenchmarkIndex)
        .with_profile(product_type, consumer_type)
        .with_price(Some(price))
        .essential(essential)
}

#[test]
fn test_essential_mismatch_lands_in_reference() {
    let engine = ComparabilityEngine::default();
    let result = engine.check_comparability(
        &subscription_target(),
        &candidate("Rice delivery", "physical", "B2C", 40000.0, true),
    );

    assert_eq!(result.details[&Criterion::ProductType].points, 1.0);
    assert_eq!(result.details[&Criterion::ConsumerType].points, 1.0);
    assert_eq!(result.details[&Criterion::Price].points, 1.0, "Ratio 1.25 is within 1.5");
    assert_eq!(result.details[&Criterion::PurchaseContext].verdict, Verdict::Different);
    assert_eq!(result.score, 3.0);
    assert_eq!(result.decision, Decision::Reference);
}

#[test]
fn test_b2b_software_is_rejected() {
    let engine = ComparabilityEngine::default();
    let result = engine.check_comparability(
        &subscription_target(),
        &candidate("Design tool", "software", "B2B", 200000.0, false),
    );

    assert_eq!(result.details[&Criterion::ProductType].points, 0.0);
    assert_eq!(result.details[&Criterion::ConsumerType].points, 0.0);
    assert_eq!(result.details[&Criterion::Price].points, 0.0, "Ratio 4.0 is beyond 3.0");
    assert_eq!(result.details[&Criterion::PurchaseContext].points, 1.0);
    assert_eq!(result.score, 1.0);
    assert_eq!(result.decision, Decision::Reject);
}

#[test]
fn test_scoring_is_deterministic() {
    let engine = ComparabilityEngine::default();
    let target = subscription_target();
    let bench = candidate("Rice delivery", "physical", "B2C", 40000.0, true);

    let first = engine.check_comparability(&target, &bench);
    let second = engine.check_comparability(&target, &bench);
    assert_eq!(first, second);
}

#[test]
fn test_zero_adopted_document_is_valid() {
    let candidates = vec![
        candidate("Rice delivery", "physical", "B2C", 40000.0, true),
        candidate("Design tool", "software", "B2B", 200000.0, false),
    ];

    let doc = generate_estimation_doc(
        "EST_PIANO",
        "Monthly piano subscription sign-ups",
        &subscription_target(),
        &candidates,
        &["Sign-ups = visitors x conversion".to_string()],
        Some(120.0),
        ConfidenceLevel::Medium,
        Some(ErrorRange::relative_to(120.0, 0.3)),
    );

    assert!(doc.base_data().is_empty());
    assert_eq!(doc.confidence(), ConfidenceLevel::Low);
    assert_eq!(doc.comparability_check().referenced, 1);
    assert_eq!(doc.comparability_check().rejected, 1);
    assert_eq!(doc.rejected()[0].name, "Design tool");
    assert!(doc.verification().contains("±30%"));
}

#[test]
fn test_document_counts_match_candidate_count() {
    let candidates: Vec<_> = (0..7)
        .map(|i| {
            let (product_type, consumer_type) = match i % 3 {
                0 => ("physical", "B2C"),
                1 => ("hardware", "B2C"),
                _ => ("service", "B2G"),
            };
            candidate(&format!("c{}", i), product_type, consumer_type, 45000.0, false)
        })
        .collect();

    let doc = generate_estimation_doc(
        "EST_COUNTS",
        "x",
        &subscription_target(),
        &candidates,
        &[],
        None,
        ConfidenceLevel::High,
        None,
    );

    let counts = doc.comparability_check();
    assert_eq!(counts.total_candidates, candidates.len());
    assert_eq!(counts.adopted + counts.referenced + counts.rejected, candidates.len());
    assert_eq!(counts.adopted, 5, "physical (4.0) and hardware (3.5) both adopt");
}
