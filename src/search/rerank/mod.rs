//! Relevance gates and the heuristic reranker.
//!
//! Every threshold lives in [`RelevanceThresholds`] so the gates can be tuned
//! from configuration and exercised in isolation.


use serde::{Deserialize, Serialize};

use super::keywords::words_longer_than;
use super::{FaqResult, sort_by_similarity};
use crate::config::ConfigError;

/// Words in an answer that signal concrete, actionable guidance.
pub const ACTION_WORDS: &[&str] = &[
    "aim", "avoid", "consume", "eat", "focus", "increase", "reduce", "start", "take", "track",
    "try", "use",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceThresholds {
    /// How many leading results the gates inspect.
    pub top_k: usize,
    /// Query words must be longer than this to count as overlap.
    pub min_word_len: usize,
    /// A relevant result must score above this.
    pub relevance_min_similarity: f32,
    /// Expand when the best result is below this.
    pub expand_top_similarity: f32,
    /// Similarity a result needs to count as "strong".
    pub strong_similarity: f32,
    /// Expand when fewer than this many results are strong.
    pub min_strong_results: usize,
    pub exact_match_weight: f32,
    pub question_overlap_weight: f32,
    pub content_overlap_weight: f32,
    pub action_word_weight: f32,
    /// Share of the reranked score kept from the incoming similarity.
    pub vector_weight: f32,
}

impl Default for RelevanceThresholds {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_word_len: 3,
            relevance_min_similarity: 0.2,
            expand_top_similarity: 0.4,
            strong_similarity: 0.3,
            min_strong_results: 3,
            exact_match_weight: 0.4,
            question_overlap_weight: 0.3,
            content_overlap_weight: 0.2,
            action_word_weight: 0.1,
            vector_weight: 0.5,
        }
    }
}

impl RelevanceThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        for (name, value) in [
            ("relevance_min_similarity", self.relevance_min_similarity),
            ("expand_top_similarity", self.expand_top_similarity),
            ("strong_similarity", self.strong_similarity),
            ("exact_match_weight", self.exact_match_weight),
            ("question_overlap_weight", self.question_overlap_weight),
            ("content_overlap_weight", self.content_overlap_weight),
            ("action_word_weight", self.action_word_weight),
            ("vector_weight", self.vector_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold(name, value));
            }
        }

        Ok(())
    }
}

/// Whether vector results can be trusted without a fallback.
///
/// True iff one of the top `top_k` results shares a query word longer than
/// `min_word_len` and scores above `relevance_min_similarity`.
#[inline]
pub fn are_results_relevant(
    query: &str,
    results: &[FaqResult],
    thresholds: &RelevanceThresholds,
) -> bool {
    let words = words_longer_than(query, thresholds.min_word_len);
    if words.is_empty() {
        return false;
    }

    results.iter().take(thresholds.top_k).any(|result| {
        if result.similarity <= thresholds.relevance_min_similarity {
            return false;
        }
        let text = result.searchable_text();
        words.iter().any(|word| text.contains(word.as_str()))
    })
}

/// Whether the more expensive expansion path is worth taking.
#[inline]
pub fn should_expand_query(
    query: &str,
    results: &[FaqResult],
    thresholds: &RelevanceThresholds,
) -> bool {
    let Some(top) = results
        .iter()
        .map(|result| result.similarity)
        .reduce(f32::max)
    else {
        return true;
    };

    if top < thresholds.expand_top_similarity {
        return true;
    }

    let strong = results
        .iter()
        .filter(|result| result.similarity > thresholds.strong_similarity)
        .count();
    if strong < thresholds.min_strong_results {
        return true;
    }

    let needle = query.trim().to_lowercase();
    !results
        .iter()
        .take(thresholds.top_k)
        .any(|result| result.searchable_text().contains(&needle))
}

/// Heuristic score in `[0, 1]` for how well `result` answers `query`.
#[inline]
pub fn heuristic_score(query: &str, result: &FaqResult, thresholds: &RelevanceThresholds) -> f32 {
    let needle = query.trim().to_lowercase();
    let question = result.custom_metadata.question.to_lowercase();
    let answer = result.custom_metadata.answer.to_lowercase();
    let content = result.content.to_lowercase();

    let mut score = 0.0;

    if !needle.is_empty() && (question.contains(&needle) || answer.contains(&needle)) {
        score += thresholds.exact_match_weight;
    }

    let words = words_longer_than(query, 2);
    if !words.is_empty() {
        let total = words.len() as f32;
        let in_question = words.iter().filter(|w| question.contains(w.as_str())).count();
        let in_content = words.iter().filter(|w| content.contains(w.as_str())).count();
        score += thresholds.question_overlap_weight * (in_question as f32 / total);
        score += thresholds.content_overlap_weight * (in_content as f32 / total);
    }

    let answer_words = words_longer_than(&answer, 1);
    if ACTION_WORDS
        .iter()
        .any(|action| answer_words.iter().any(|word| word == action))
    {
        score += thresholds.action_word_weight;
    }

    score.min(1.0)
}

/// Blend each similarity with its heuristic score and re-sort.
#[inline]
pub fn simple_reranking(
    query: &str,
    mut results: Vec<FaqResult>,
    thresholds: &RelevanceThresholds,
) -> Vec<FaqResult> {
    let keep = thresholds.vector_weight;
    for result in &mut results {
        let heuristic = heuristic_score(query, result, thresholds);
        let blended = keep * result.similarity.clamp(0.0, 1.0) + (1.0 - keep) * heuristic;
        result.similarity = blended.min(1.0);
    }

    sort_by_similarity(&mut results);
    results
}
