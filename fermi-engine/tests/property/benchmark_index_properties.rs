use fermi_engine::sources::benchmark_index::{BenchmarkCatalog, BenchmarkRecord, InMemoryBenchmarkIndex};
use proptest::prelude::*;

fn record(value: f64) -> BenchmarkRecord {
    BenchmarkRecord {
        name: "rule of thumb".to_string(),
        value,
        product_type: "digital".to_string(),
        consumer_type: "B2C".to_string(),
        price: None,
        is_essential: false,
        source: "prop".to_string(),
        confidence: 0.7,
        context: Default::default(),
    }
}

fn build(keys: &[String]) -> InMemoryBenchmarkIndex {
    let mut index = InMemoryBenchmarkIndex::default();
    for (i, key) in keys.iter().enumerate() {
        index.insert(key, vec![record(i as f64)]);
    }
    index
}

proptest! {
    #[test]
    fn exact_key_is_found(keys in prop::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,2}", 1..10)) {
        let index = build(&keys);
        for key in &keys {
            prop_assert!(index.get(key).is_some());
            prop_assert!(index.get(&key.to_uppercase()).is_some(), "lookup is case-insensitive");
        }
    }

    #[test]
    fn existing_key_is_its_own_best_match(keys in prop::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,2}", 1..10)) {
        let index = build(&keys);
        for key in &keys {
            let entry = index.similarity_search(key);
            prop_assert_eq!(entry.map(|e| e.key.clone()), Some(key.clone()));
        }
    }

    #[test]
    fn similarity_search_is_deterministic(
        keys in prop::collection::vec("[a-z]{1,8}( [a-z]{1,8}){0,2}", 1..10),
        query in "[a-z ]{0,20}",
    ) {
        let index = build(&keys);
        let fresh = build(&keys);

        let first = index.similarity_search(&query).map(|e| e.key.clone());
        let memoized = index.similarity_search(&query).map(|e| e.key.clone());
        let independent = fresh.similarity_search(&query).map(|e| e.key.clone());

        prop_assert_eq!(&first, &memoized);
        prop_assert_eq!(&first, &independent);
    }
}
