//! The end-to-end FAQ search.


use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::fallback::text_fallback_search;
use super::keywords::expand_query;
use super::rerank::{are_results_relevant, should_expand_query, simple_reranking};
use super::{
    DistanceMetric, ExpansionPolicy, FaqMetadata, FaqResult, deduplicate_results,
    sort_by_similarity,
};
use crate::cache::{ResultsKey, SearchCaches};
use crate::config::settings::MAX_MATCH_COUNT;
use crate::config::{Config, SearchConfig};
use crate::embeddings::{EmbeddingProvider, OpenAiEmbeddingClient};
use crate::store::{Backends, FAQ_DATA_TYPE, FaqTextStore, MatchedDocument, VectorIndex};

/// Which route produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPath {
    /// Blank query, nothing was searched.
    Empty,
    /// Served from the results cache.
    Cached,
    /// Single vector search, results used as-is.
    Vector,
    /// Vector search over the expanded query set.
    Expanded,
    /// Keyword substring search replaced or topped up the vector results.
    TextFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<FaqResult>,
    pub path: SearchPath,
    pub reranked: bool,
}

impl SearchOutcome {
    fn new(results: Vec<FaqResult>, path: SearchPath) -> Self {
        Self {
            results,
            path,
            reranked: false,
        }
    }
}

/// Sequences caches, embeddings, vector search, expansion, the keyword
/// fallback and reranking. Never returns an error: every failure below it
/// degrades to fewer results.
#[derive(Clone)]
pub struct FaqSearcher {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorIndex>,
    text_store: Arc<dyn FaqTextStore>,
    caches: Arc<SearchCaches>,
    config: SearchConfig,
}

impl FaqSearcher {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vectors: Arc<dyn VectorIndex>,
        text_store: Arc<dyn FaqTextStore>,
        caches: Arc<SearchCaches>,
        config: SearchConfig,
    ) -> Self {
        Self {
            embedder,
            vectors,
            text_store,
            caches,
            config,
        }
    }

    /// Wire up the embedding client and storage backend named in `config`.
    #[inline]
    pub async fn from_config(config: &Config) -> crate::Result<Self> {
        let embedder = Arc::new(OpenAiEmbeddingClient::new(config)?);
        let backends = Backends::from_config(config).await?;
        let caches = Arc::new(SearchCaches::new(&config.search.cache));

        Ok(Self::new(
            embedder,
            backends.vector_index,
            backends.text_store,
            caches,
            config.search.clone(),
        ))
    }

    #[inline]
    pub fn caches(&self) -> &Arc<SearchCaches> {
        &self.caches
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search with the configured default limit and expansion policy.
    #[inline]
    pub async fn search_default(&self, query: &str) -> Vec<FaqResult> {
        self.search(query, self.config.default_limit, self.config.expansion_policy)
            .await
    }

    #[inline]
    pub async fn search(&self, query: &str, limit: usize, policy: ExpansionPolicy) -> Vec<FaqResult> {
        self.search_with_outcome(query, limit, policy).await.results
    }

    /// Run the pipeline and report which path produced the results.
    pub async fn search_with_outcome(
        &self,
        query: &str,
        limit: usize,
        policy: ExpansionPolicy,
    ) -> SearchOutcome {
        let trimmed = query.trim();
        if trimmed.is_empty() || limit == 0 {
            return SearchOutcome::new(Vec::new(), SearchPath::Empty);
        }

        let key = ResultsKey::new(trimmed, limit, policy);
        if let Some(results) = self.caches.results.get(&key) {
            debug!("Results cache hit for '{}'", trimmed);
            return SearchOutcome::new(results, SearchPath::Cached);
        }

        let match_count = limit
            .min(self.config.max_match_count)
            .min(MAX_MATCH_COUNT);
        let thresholds = &self.config.thresholds;

        let embedding = self.embed_query(trimmed).await;
        let initial = match &embedding {
            Some(embedding) => self.vector_search(embedding, match_count).await,
            None => Vec::new(),
        };

        // Expansion needs the embedding service; without it go straight to keywords
        let expand = embedding.is_some()
            && match policy {
                ExpansionPolicy::Never => false,
                ExpansionPolicy::Always => true,
                ExpansionPolicy::Conditional => {
                    should_expand_query(trimmed, &initial, thresholds)
                }
            };

        let (mut results, mut path) = if expand {
            (
                self.expanded_search(trimmed, initial, match_count).await,
                SearchPath::Expanded,
            )
        } else {
            (initial, SearchPath::Vector)
        };
        results = deduplicate_results(results);

        if results.is_empty() || !are_results_relevant(trimmed, &results, thresholds) {
            let fallback = self.text_fallback(trimmed, match_count).await;
            if !fallback.is_empty() {
                debug!("Text fallback contributed {} results", fallback.len());
                results = deduplicate_results(results.into_iter().chain(fallback).collect());
                path = SearchPath::TextFallback;
            }
        }

        let reranked = path != SearchPath::Vector && !results.is_empty();
        if reranked {
            results = simple_reranking(trimmed, results, thresholds);
        }

        sort_by_similarity(&mut results);
        results.truncate(limit);

        info!(
            "Search '{}' returned {} results via {:?} (policy {})",
            trimmed,
            results.len(),
            path,
            policy
        );

        // Empty outcomes are cached too so repeats stay off the network
        self.caches.results.insert(key, results.clone());

        SearchOutcome {
            results,
            path,
            reranked,
        }
    }

    /// Embedding for `text`, from the cache or the provider.
    ///
    /// `None` when the provider fails or exceeds the embedding timeout.
    pub async fn embed_query(&self, text: &str) -> Option<Vec<f32>> {
        let key = text.trim().to_string();
        if let Some(embedding) = self.caches.embeddings.get(&key) {
            debug!("Embedding cache hit for '{}'", key);
            return Some(embedding);
        }

        let timeout = self.config.timeouts.embedding();
        match tokio::time::timeout(timeout, self.embedder.embed(&key)).await {
            Ok(Ok(embedding)) => {
                self.caches.embeddings.insert(key, embedding.clone());
                Some(embedding)
            }
            Ok(Err(e)) => {
                warn!(
                    "Embedding with {} failed for '{}': {}",
                    self.embedder.model(),
                    key,
                    e
                );
                None
            }
            Err(_) => {
                warn!("Embedding timed out after {:?} for '{}'", timeout, key);
                None
            }
        }
    }

    /// Vector similarity search; failures and timeouts yield no results.
    pub async fn vector_search(&self, embedding: &[f32], match_count: usize) -> Vec<FaqResult> {
        let match_count = match_count.min(MAX_MATCH_COUNT);
        let timeout = self.config.timeouts.vector();

        match tokio::time::timeout(timeout, self.vectors.match_documents(embedding, match_count))
            .await
        {
            Ok(Ok(documents)) => {
                let metric = self.config.distance_metric;
                let mut results: Vec<FaqResult> = documents
                    .into_iter()
                    .map(|document| document_to_result(document, metric))
                    .collect();
                sort_by_similarity(&mut results);
                results
            }
            Ok(Err(e)) => {
                warn!("Vector search failed: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!("Vector search timed out after {:?}", timeout);
                Vec::new()
            }
        }
    }

    /// Alternative phrasings of `query`, cached.
    pub fn expansions(&self, query: &str) -> Vec<String> {
        let key = query.trim().to_lowercase();
        if let Some(expanded) = self.caches.expansions.get(&key) {
            return expanded;
        }

        let expanded = expand_query(query, self.config.max_expansions);
        self.caches.expansions.insert(key, expanded.clone());
        expanded
    }

    async fn expanded_search(
        &self,
        query: &str,
        seed: Vec<FaqResult>,
        match_count: usize,
    ) -> Vec<FaqResult> {
        // The first phrase is the query itself, already searched as the seed
        let alternatives: Vec<String> = self.expansions(query).into_iter().skip(1).collect();
        debug!("Expanding '{}' into {:?}", query, alternatives);

        let embeddings = join_all(alternatives.iter().map(|phrase| self.embed_query(phrase))).await;
        let searches = join_all(
            embeddings
                .iter()
                .flatten()
                .map(|embedding| self.vector_search(embedding, match_count)),
        )
        .await;

        seed.into_iter()
            .chain(searches.into_iter().flatten())
            .collect()
    }

    async fn text_fallback(&self, query: &str, limit: usize) -> Vec<FaqResult> {
        text_fallback_search(
            self.text_store.as_ref(),
            query,
            limit,
            self.config.timeouts.text(),
        )
        .await
    }
}

/// Convert a raw vector-search row, turning its distance into a similarity.
#[inline]
pub fn document_to_result(document: MatchedDocument, metric: DistanceMetric) -> FaqResult {
    let MatchedDocument {
        content,
        metadata,
        distance,
    } = document;

    let custom_metadata =
        FaqMetadata::from_json_value(metadata.custom_metadata_from_db.as_ref(), &content);
    let data_type = if metadata.data_type.is_empty() {
        FAQ_DATA_TYPE.to_string()
    } else {
        metadata.data_type
    };

    FaqResult {
        upsert_key: metadata.upsert_key,
        content,
        data_type,
        source_doc_name: metadata.source_doc_name,
        custom_metadata,
        similarity: metric.to_similarity(distance),
    }
}
