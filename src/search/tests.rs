use super::*;
use serde_json::json;

fn result(key: &str, similarity: f32) -> FaqResult {
    FaqResult {
        upsert_key: key.to_string(),
        content: format!("content {key}"),
        data_type: "faq".to_string(),
        source_doc_name: "faq.json".to_string(),
        custom_metadata: FaqMetadata {
            question: format!("question {key}"),
            answer: format!("answer {key}"),
        },
        similarity,
    }
}

#[test]
fn deduplicate_keeps_first_occurrence_in_order() {
    let input = vec![
        result("a", 0.9),
        result("b", 0.8),
        result("a", 0.7),
        result("c", 0.6),
        result("b", 0.95),
    ];

    let deduped = deduplicate_results(input.clone());
    let keys: Vec<&str> = deduped.iter().map(|r| r.upsert_key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);

    assert_eq!(deduped[0], input[0]);
    assert_eq!(deduped[1], input[1]);
    assert_eq!(deduped[2], input[3]);
}

#[test]
fn deduplicate_is_a_subset_without_repeated_keys() {
    let input: Vec<FaqResult> = (0..40)
        .map(|i| result(&format!("k{}", i % 7), i as f32 / 40.0))
        .collect();

    let deduped = deduplicate_results(input.clone());
    let mut seen = std::collections::HashSet::new();
    for item in &deduped {
        assert!(seen.insert(item.upsert_key.clone()));
        assert!(input.contains(item));
    }
    assert_eq!(deduped.len(), 7);
}

#[test]
fn deduplicate_empty_input() {
    assert!(deduplicate_results(Vec::new()).is_empty());
}

#[test]
fn sort_by_similarity_descending() {
    let mut results = vec![result("a", 0.2), result("b", 0.9), result("c", 0.5)];
    sort_by_similarity(&mut results);
    let keys: Vec<&str> = results.iter().map(|r| r.upsert_key.as_str()).collect();
    assert_eq!(keys, vec!["b", "c", "a"]);
}

#[test]
fn legacy_distance_conversion() {
    let metric = DistanceMetric::Legacy;
    assert!((metric.to_similarity(0.1) - 0.9).abs() < 1e-6);
    assert!((metric.to_similarity(-0.25) - 0.75).abs() < 1e-6);
    assert_eq!(metric.to_similarity(1.4), 0.0);
    assert_eq!(metric.to_similarity(f32::NAN), 0.0);
}

#[test]
fn cosine_and_similarity_conversions() {
    assert!((DistanceMetric::Cosine.to_similarity(0.0) - 1.0).abs() < 1e-6);
    assert!((DistanceMetric::Cosine.to_similarity(1.0) - 0.5).abs() < 1e-6);
    assert_eq!(DistanceMetric::Cosine.to_similarity(2.5), 0.0);
    assert!((DistanceMetric::Similarity.to_similarity(0.83) - 0.83).abs() < 1e-6);
    assert_eq!(DistanceMetric::Similarity.to_similarity(1.7), 1.0);
}

#[test]
fn metadata_from_object_and_encoded_string() {
    let object = json!({"question": "How much protein?", "answer": "About 1.6 g/kg."});
    let parsed = FaqMetadata::from_json_value(Some(&object), "raw");
    assert_eq!(parsed.question, "How much protein?");

    let encoded = json!("{\"question\":\"Is creatine safe?\",\"answer\":\"Yes, at 3-5 g/day.\"}");
    let parsed = FaqMetadata::from_json_value(Some(&encoded), "raw");
    assert_eq!(parsed.answer, "Yes, at 3-5 g/day.");
}

#[test]
fn malformed_metadata_uses_placeholder() {
    let broken = json!("{not json");
    let parsed = FaqMetadata::from_json_value(Some(&broken), "Q: a\nA: b");
    assert_eq!(parsed.question, FaqMetadata::PLACEHOLDER_QUESTION);
    assert_eq!(parsed.answer, "Q: a\nA: b");

    let missing = FaqMetadata::from_json_value(None, "content");
    assert_eq!(missing, FaqMetadata::placeholder("content"));

    let wrong_shape = json!({"q": "x"});
    let parsed = FaqMetadata::from_json_value(Some(&wrong_shape), "content");
    assert_eq!(parsed.question, FaqMetadata::PLACEHOLDER_QUESTION);
}

#[test]
fn expansion_policy_parsing_and_display() {
    assert_eq!(
        "Conditional".parse::<ExpansionPolicy>().expect("parses"),
        ExpansionPolicy::Conditional
    );
    assert_eq!(ExpansionPolicy::Always.to_string(), "always");
    assert!("sometimes".parse::<ExpansionPolicy>().is_err());
}
