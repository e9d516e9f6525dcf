//! FAQ retrieval pipeline.
//!
//! [`FaqSearcher`] sequences the caches, embedding generation, vector search,
//! the keyword fallback and the reranker. Everything below it degrades to an
//! emptier result set on failure; a search never returns an error.

#[cfg(test)]
mod tests;

pub mod fallback;
pub mod keywords;
pub mod orchestrator;
pub mod rerank;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use orchestrator::{FaqSearcher, SearchOutcome, SearchPath};
pub use rerank::{RelevanceThresholds, are_results_relevant, should_expand_query, simple_reranking};

/// Question and answer text attached to an FAQ document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqMetadata {
    pub question: String,
    pub answer: String,
}

impl FaqMetadata {
    pub const PLACEHOLDER_QUESTION: &'static str = "Untitled FAQ";

    /// Metadata used when the stored JSON cannot be parsed.
    #[inline]
    pub fn placeholder(content: &str) -> Self {
        Self {
            question: Self::PLACEHOLDER_QUESTION.to_string(),
            answer: content.to_string(),
        }
    }

    /// Parse metadata stored either as a JSON object or as a JSON-encoded string.
    ///
    /// Falls back to [`FaqMetadata::placeholder`] on anything malformed.
    #[inline]
    pub fn from_json_value(value: Option<&serde_json::Value>, content: &str) -> Self {
        let parsed = match value {
            Some(serde_json::Value::String(raw)) => serde_json::from_str::<Self>(raw).ok(),
            Some(object @ serde_json::Value::Object(_)) => {
                serde_json::from_value::<Self>(object.clone()).ok()
            }
            _ => None,
        };

        parsed.unwrap_or_else(|| {
            tracing::debug!("Malformed custom metadata, using placeholder question");
            Self::placeholder(content)
        })
    }
}

/// One retrieved question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqResult {
    pub upsert_key: String,
    pub content: String,
    pub data_type: String,
    pub source_doc_name: String,
    pub custom_metadata: FaqMetadata,
    /// Ranked relevance in roughly 0..1; not a probability.
    pub similarity: f32,
}

impl FaqResult {
    /// Lowercased question, answer and content joined for term matching.
    #[inline]
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {}",
            self.custom_metadata.question, self.custom_metadata.answer, self.content
        )
        .to_lowercase()
    }
}

/// When the orchestrator spends extra embedding and vector calls on query expansion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionPolicy {
    /// Single vector search, text fallback when it is empty or irrelevant.
    Never,
    /// Always search with the expanded query set.
    Always,
    /// Expand only when the plain vector results look weak.
    #[default]
    Conditional,
}

impl fmt::Display for ExpansionPolicy {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ExpansionPolicy::Never => write!(f, "never"),
            ExpansionPolicy::Always => write!(f, "always"),
            ExpansionPolicy::Conditional => write!(f, "conditional"),
        }
    }
}

impl std::str::FromStr for ExpansionPolicy {
    type Err = crate::FaqError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(ExpansionPolicy::Never),
            "always" => Ok(ExpansionPolicy::Always),
            "conditional" => Ok(ExpansionPolicy::Conditional),
            other => Err(crate::FaqError::Config(format!(
                "Unknown expansion policy: {}",
                other
            ))),
        }
    }
}

/// How the `similarity` column returned by the vector index is turned into a
/// similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `max(0, 1 - |d|)`, matching the hosted `match_documents` deployment.
    #[default]
    Legacy,
    /// Cosine distance in `[0, 2]`, mapped linearly onto `[0, 1]`.
    Cosine,
    /// The column already holds a similarity.
    Similarity,
}

impl DistanceMetric {
    #[inline]
    pub fn to_similarity(self, distance: f32) -> f32 {
        if !distance.is_finite() {
            return 0.0;
        }

        match self {
            DistanceMetric::Legacy => (1.0 - distance.abs()).max(0.0),
            DistanceMetric::Cosine => (1.0 - distance / 2.0).clamp(0.0, 1.0),
            DistanceMetric::Similarity => distance.clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for DistanceMetric {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DistanceMetric::Legacy => write!(f, "legacy"),
            DistanceMetric::Cosine => write!(f, "cosine"),
            DistanceMetric::Similarity => write!(f, "similarity"),
        }
    }
}

/// Drop later results whose `upsert_key` was already seen, preserving order.
#[inline]
pub fn deduplicate_results(results: Vec<FaqResult>) -> Vec<FaqResult> {
    results
        .into_iter()
        .unique_by(|result| result.upsert_key.clone())
        .collect()
}

/// Sort by descending similarity; ties keep their incoming order.
#[inline]
pub fn sort_by_similarity(results: &mut [FaqResult]) {
    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
}
