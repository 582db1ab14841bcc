use fermi_engine::comparability::{Criterion, Verdict};
use fermi_engine::{BenchmarkCandidate, ComparabilityEngine, Decision, SourceKind, TargetProfile};
use proptest::prelude::*;

fn product_type() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["physical", "hardware", "device", "digital", "software", "app", "service", "platform", "other"])
        .prop_map(String::from)
}

fn consumer_type() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["B2C", "B2B", "B2G", "b2c"]).prop_map(String::from)
}

fn price() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(1.0f64..1_000_000.0)
}

prop_compose! {
    fn target()(pt in product_type(), ct in consumer_type(), p in price(), e in any::<bool>()) -> TargetProfile {
        let mut target = TargetProfile::new("target", pt, ct).essential(e);
        target.price = p;
        target
    }
}

prop_compose! {
    fn candidate()(pt in product_type(), ct in consumer_type(), p in price(), e in any::<bool>(), v in -1e6f64..1e6) -> BenchmarkCandidate {
        BenchmarkCandidate::new("candidate", v, "prop", SourceKind::BenchmarkIndex)
            .with_profile(pt, ct)
            .with_price(p)
            .essential(e)
    }
}

proptest! {
    #[test]
    fn score_is_bounded(t in target(), c in candidate()) {
        let result = ComparabilityEngine::default().check_comparability(&t, &c);
        prop_assert!((0.0..=4.0).contains(&result.score), "score {} out of range", result.score);
        prop_assert_eq!(result.details.len(), 4);
    }

    #[test]
    fn decision_follows_thresholds(t in target(), c in candidate()) {
        let result = ComparabilityEngine::default().check_comparability(&t, &c);
        let expected = if result.score >= 3.5 {
            Decision::Adopt
        } else if result.score >= 2.5 {
            Decision::Reference
        } else {
            Decision::Reject
        };
        prop_assert_eq!(result.decision, expected);
    }

    #[test]
    fn scoring_is_pure(t in target(), c in candidate()) {
        let engine = ComparabilityEngine::default();
        prop_assert_eq!(engine.check_comparability(&t, &c), engine.check_comparability(&t, &c));
    }

    #[test]
    fn missing_price_never_penalizes(t in target(), c in candidate()) {
        let engine = ComparabilityEngine::default();
        let without_price = c.clone().with_price(None);
        let priced = engine.check_comparability(&t, &c).score;
        let unpriced = engine.check_comparability(&t, &without_price).score;
        prop_assert!(unpriced <= priced, "dropping the price can only remove points");
    }

    #[test]
    fn missing_price_scores_exactly_zero(t in target(), c in candidate()) {
        let engine = ComparabilityEngine::default();
        let mut unpriced_target = t.clone();
        unpriced_target.price = None;

        for (target, candidate) in [(&t, c.clone().with_price(None)), (&unpriced_target, c.clone())] {
            let result = engine.check_comparability(target, &candidate);
            let price = &result.details[&Criterion::Price];
            prop_assert_eq!(price.verdict, Verdict::NotAvailable);
            prop_assert_eq!(price.points, 0.0);

            let others: f64 = result
                .details
                .iter()
                .filter(|(criterion, _)| **criterion != Criterion::Price)
                .map(|(_, detail)| detail.points)
                .sum();
            prop_assert_eq!(result.score, others);
        }
    }

    #[test]
    fn partition_is_complete(t in target(), cs in prop::collection::vec(candidate(), 0..20)) {
        let filtered = ComparabilityEngine::default().filter_candidates(&t, &cs);
        prop_assert_eq!(filtered.total(), cs.len());
        prop_assert!(filtered.adopt.iter().all(|r| r.decision == Decision::Adopt));
        prop_assert!(filtered.reference.iter().all(|r| r.decision == Decision::Reference));
        prop_assert!(filtered.reject.iter().all(|r| r.decision == Decision::Reject));
    }
}
