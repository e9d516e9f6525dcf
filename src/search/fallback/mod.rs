//! Keyword substring fallback used when vector search comes back empty or
//! irrelevant.


use std::time::Duration;
use tracing::{debug, warn};

use super::keywords::search_terms;
use super::{FaqMetadata, FaqResult, sort_by_similarity};
use crate::config::settings::MAX_MATCH_COUNT;
use crate::store::{FaqRow, FaqTextStore};

pub const FALLBACK_BASE_SCORE: f32 = 0.5;
pub const FALLBACK_SCORE_PER_TERM: f32 = 0.1;
/// Fallback hits never outrank a confident vector match.
pub const FALLBACK_MAX_SCORE: f32 = 0.8;

/// Convert a raw FAQ row, parsing its metadata or substituting a placeholder.
#[inline]
pub fn normalize_row(row: FaqRow) -> FaqResult {
    let custom_metadata = FaqMetadata::from_json_value(row.custom_metadata.as_ref(), &row.content);
    FaqResult {
        upsert_key: row.upsert_key,
        content: row.content,
        data_type: row.data_type,
        source_doc_name: row.source_doc_name,
        custom_metadata,
        similarity: 0.0,
    }
}

/// `min(0.8, 0.5 + 0.1 * hits)` where hits counts terms found in the
/// question or answer.
#[inline]
pub fn fallback_score(result: &FaqResult, terms: &[String]) -> f32 {
    let haystack = format!(
        "{} {}",
        result.custom_metadata.question, result.custom_metadata.answer
    )
    .to_lowercase();
    let hits = terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .count();

    (FALLBACK_BASE_SCORE + FALLBACK_SCORE_PER_TERM * hits as f32).min(FALLBACK_MAX_SCORE)
}

/// Score and order rows already fetched for `terms`.
#[inline]
pub fn score_rows(rows: Vec<FaqRow>, terms: &[String], limit: usize) -> Vec<FaqResult> {
    let mut results: Vec<FaqResult> = rows
        .into_iter()
        .map(normalize_row)
        .map(|mut result| {
            result.similarity = fallback_score(&result, terms);
            result
        })
        .collect();

    sort_by_similarity(&mut results);
    results.truncate(limit);
    results
}

/// Substring search over FAQ content.
///
/// The store returns matches in its own order, so a pool of up to
/// [`MAX_MATCH_COUNT`] rows is scored before cutting down to `limit`.
/// Never fails: store errors and timeouts are logged and yield no results.
pub async fn text_fallback_search(
    store: &dyn FaqTextStore,
    query: &str,
    limit: usize,
    timeout: Duration,
) -> Vec<FaqResult> {
    let terms = search_terms(query);
    if terms.is_empty() || limit == 0 {
        return Vec::new();
    }

    debug!("Text fallback with {} terms: {:?}", terms.len(), terms);

    let pool = limit.max(MAX_MATCH_COUNT);
    match tokio::time::timeout(timeout, store.search_terms(&terms, pool)).await {
        Ok(Ok(rows)) => score_rows(rows, &terms, limit),
        Ok(Err(e)) => {
            warn!("Text fallback search failed: {}", e);
            Vec::new()
        }
        Err(_) => {
            warn!("Text fallback search timed out after {:?}", timeout);
            Vec::new()
        }
    }
}
