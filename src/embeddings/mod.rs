// Embeddings module
// Turns query text into vectors for the similarity search

pub mod openai;

use async_trait::async_trait;

use crate::Result;

pub use openai::OpenAiEmbeddingClient;

/// Anything that can turn a piece of text into an embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
