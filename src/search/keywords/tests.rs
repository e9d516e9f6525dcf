use super::*;

#[test]
fn tokenize_lowercases_and_splits_punctuation() {
    assert_eq!(
        tokenize("How much Protein, per-day? I'm 80kg."),
        vec!["how", "much", "protein", "per", "day", "i'm", "80kg"]
    );
    assert!(tokenize("   ").is_empty());
}

#[test]
fn words_longer_than_filters_and_dedupes() {
    assert_eq!(
        words_longer_than("eat eat protein is good protein", 3),
        vec!["protein", "good"]
    );
}

#[test]
fn protein_query_matches_protein_and_meal_categories() {
    let names: Vec<&str> = matched_categories("how much protein should I eat")
        .iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["protein", "meal_planning"]);
}

#[test]
fn prefix_matching_handles_plurals() {
    let names: Vec<&str> = matched_categories("which supplements help with macros")
        .iter()
        .map(|c| c.name)
        .collect();
    assert!(names.contains(&"supplements"));
    assert!(names.contains(&"meal_planning"));
}

#[test]
fn phrase_triggers_match_as_substrings() {
    let names: Vec<&str> = matched_categories("What should I do during PEAK WEEK?")
        .iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["contest_prep"]);

    let names: Vec<&str> = matched_categories("is 16:8 better than omad")
        .iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["fasting"]);
}

#[test]
fn extract_keywords_unions_categories_without_duplicates() {
    let keywords = extract_keywords("fat loss calorie deficit");
    assert!(keywords.contains(&"fat loss"));
    assert!(keywords.contains(&"deficit"));
    let calories = keywords.iter().filter(|k| **k == "calories").count();
    assert_eq!(calories, 1);
}

#[test]
fn unrelated_query_has_no_keywords() {
    assert!(extract_keywords("where is my order").is_empty());
}

#[test]
fn search_terms_start_with_query_tokens_and_are_capped() {
    let terms = search_terms("how much protein should I eat");
    assert_eq!(&terms[..4], &["how", "much", "protein", "should"]);
    assert!(terms.contains(&"grams".to_string()));
    assert!(!terms.contains(&"i".to_string()));
    assert!(terms.len() <= MAX_SEARCH_TERMS);

    let long = search_terms(
        "protein creatine fasting sleep squat contest meal deficit whey casein leucine vitamin",
    );
    assert_eq!(long.len(), MAX_SEARCH_TERMS);
}

#[test]
fn expand_query_keeps_original_first() {
    let expanded = expand_query("  how much protein should I eat ", 3);
    assert_eq!(expanded[0], "how much protein should I eat");
    assert_eq!(expanded.len(), 4);
    assert_eq!(expanded[1], "daily protein intake");
    assert_eq!(expanded[2], "meal plan");
}

#[test]
fn expand_query_without_category_uses_content_words() {
    let expanded = expand_query("where is my order tracking", 3);
    assert_eq!(expanded, vec!["where is my order tracking", "order tracking"]);
}

#[test]
fn expand_query_empty_input() {
    assert!(expand_query("   ", 3).is_empty());
    assert_eq!(expand_query("how are you", 3), vec!["how are you"]);
}
