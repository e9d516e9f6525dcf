#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::EmbeddingProvider;
use crate::config::Config;
use crate::{FaqError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingClient {
    endpoint: Url,
    model: String,
    dimensions: u32,
    api_key: String,
    timeout: Duration,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenAiEmbeddingClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let endpoint = config
            .embeddings
            .endpoint_url()
            .map_err(|e| FaqError::Config(e.to_string()))?;
        let api_key = config
            .embeddings
            .api_key()
            .map_err(|e| FaqError::Config(e.to_string()))?;

        Ok(Self::with_endpoint(
            endpoint,
            config.embeddings.model.clone(),
            config.embeddings.dimensions,
            api_key,
        )
        .with_timeout(config.search.timeouts.embedding()))
    }

    /// Build a client without consulting configuration or the environment.
    #[inline]
    pub fn with_endpoint(endpoint: Url, model: String, dimensions: u32, api_key: String) -> Self {
        let timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECONDS);
        Self {
            endpoint,
            model,
            dimensions,
            api_key,
            timeout,
            agent: build_agent(timeout),
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[inline]
    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }

    /// Embed `text` with a single blocking request.
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            "Generating embedding with {} for text (length: {})",
            self.model,
            text.len()
        );

        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimensions,
        };
        let request_json = serde_json::to_string(&request)?;

        let mut response = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send(&request_json)?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| FaqError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Embedding API returned HTTP {}: {}", status, message);
            return Err(FaqError::Upstream { status, message });
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| FaqError::Embedding("Response contained no embeddings".to_string()))?;

        if embedding.len() != self.dimensions as usize {
            return Err(FaqError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let client = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || client.generate_embedding(&text))
            .await
            .map_err(|e| FaqError::Embedding(format!("Embedding task failed: {}", e)))?
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    // Status codes are inspected by hand so the error body can be reported
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
