//! Supabase (PostgREST) implementation of both search backends.


use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{FAQ_DATA_TYPE, FaqRow, FaqTextStore, MatchedDocument, VectorIndex};
use crate::config::Config;
use crate::{FaqError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const FAQ_COLUMNS: &str = "upsert_key,content,data_type,source_doc_name,custom_metadata";

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    rest_url: Url,
    api_key: String,
    rpc_function: String,
    faq_table: String,
    vector_timeout: Duration,
    text_timeout: Duration,
    vector_agent: ureq::Agent,
    text_agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct MatchDocumentsRequest<'a> {
    query_embedding: &'a [f32],
    match_count: usize,
    filter: MatchFilter,
}

#[derive(Debug, Serialize)]
struct MatchFilter {
    data_type: &'static str,
}

impl SupabaseClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let rest_url = config
            .supabase
            .rest_url()
            .map_err(|e| FaqError::Config(e.to_string()))?;
        let api_key = config
            .supabase
            .api_key()
            .map_err(|e| FaqError::Config(e.to_string()))?;

        let timeouts = &config.search.timeouts;
        Ok(Self::with_rest_url(
            rest_url,
            api_key,
            config.supabase.rpc_function.clone(),
            config.supabase.faq_table.clone(),
        )
        .with_timeouts(timeouts.vector(), timeouts.text()))
    }

    /// `rest_url` must end with a slash, e.g. `http://host/rest/v1/`.
    #[inline]
    pub fn with_rest_url(
        rest_url: Url,
        api_key: String,
        rpc_function: String,
        faq_table: String,
    ) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECONDS);
        Self {
            rest_url,
            api_key,
            rpc_function,
            faq_table,
            vector_timeout: timeout,
            text_timeout: timeout,
            vector_agent: build_agent(timeout),
            text_agent: build_agent(timeout),
        }
    }

    /// Same HTTP timeout for both the RPC and the table search.
    #[inline]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_timeouts(timeout, timeout)
    }

    #[inline]
    pub fn with_timeouts(mut self, vector: Duration, text: Duration) -> Self {
        self.vector_timeout = vector;
        self.text_timeout = text;
        self.vector_agent = build_agent(vector);
        self.text_agent = build_agent(text);
        self
    }

    #[inline]
    pub fn vector_timeout(&self) -> Duration {
        self.vector_timeout
    }

    #[inline]
    pub fn text_timeout(&self) -> Duration {
        self.text_timeout
    }

    /// URL of the similarity-search RPC.
    #[inline]
    pub fn rpc_url(&self) -> Result<Url> {
        self.rest_url
            .join(&format!("rpc/{}", self.rpc_function))
            .map_err(|e| FaqError::Config(format!("Invalid RPC URL: {}", e)))
    }

    /// URL of the substring search over the FAQ table for `terms`.
    #[inline]
    pub fn text_search_url(&self, terms: &[String], limit: usize) -> Result<Url> {
        let mut url = self
            .rest_url
            .join(&self.faq_table)
            .map_err(|e| FaqError::Config(format!("Invalid table URL: {}", e)))?;

        let predicates: Vec<String> = terms
            .iter()
            .map(|term| sanitize_term(term))
            .filter(|term| !term.is_empty())
            .map(|term| format!("content.ilike.*{}*", term))
            .collect();

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("select", FAQ_COLUMNS)
                .append_pair("data_type", &format!("eq.{}", FAQ_DATA_TYPE));
            if !predicates.is_empty() {
                query.append_pair("or", &format!("({})", predicates.join(",")));
            }
            query.append_pair("limit", &limit.to_string());
        }

        Ok(url)
    }

    /// Blocking call to the `match_documents` RPC.
    #[inline]
    pub fn match_documents_blocking(
        &self,
        embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>> {
        let url = self.rpc_url()?;
        let request = MatchDocumentsRequest {
            query_embedding: embedding,
            match_count,
            filter: MatchFilter {
                data_type: FAQ_DATA_TYPE,
            },
        };
        let request_json = serde_json::to_string(&request)?;

        debug!("Calling {} with match_count {}", url, match_count);

        let response = self
            .vector_agent
            .post(url.as_str())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&request_json)?;

        read_json(response)
    }

    /// Blocking substring search over the FAQ table.
    #[inline]
    pub fn search_terms_blocking(&self, terms: &[String], limit: usize) -> Result<Vec<FaqRow>> {
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let url = self.text_search_url(terms, limit)?;
        debug!("Querying {}", url);

        let response = self
            .text_agent
            .get(url.as_str())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .call()?;

        read_json(response)
    }
}

#[async_trait]
impl VectorIndex for SupabaseClient {
    async fn match_documents(
        &self,
        embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>> {
        let client = self.clone();
        let embedding = embedding.to_vec();
        tokio::task::spawn_blocking(move || client.match_documents_blocking(&embedding, match_count))
            .await
            .map_err(|e| FaqError::Network(format!("Vector search task failed: {}", e)))?
    }
}

#[async_trait]
impl FaqTextStore for SupabaseClient {
    async fn search_terms(&self, terms: &[String], limit: usize) -> Result<Vec<FaqRow>> {
        let client = self.clone();
        let terms = terms.to_vec();
        tokio::task::spawn_blocking(move || client.search_terms_blocking(&terms, limit))
            .await
            .map_err(|e| FaqError::Network(format!("Text search task failed: {}", e)))?
    }
}

/// Strip characters PostgREST treats as filter syntax.
#[inline]
pub fn sanitize_term(term: &str) -> String {
    term.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '\'' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn read_json<T: DeserializeOwned>(mut response: ureq::http::Response<ureq::Body>) -> Result<T> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| FaqError::Network(e.to_string()))?;

    if !(200..300).contains(&status) {
        warn!("Supabase returned HTTP {}: {}", status, body);
        return Err(FaqError::Upstream {
            status,
            message: body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
