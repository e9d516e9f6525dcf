// Storage backends
// The search pipeline talks to a vector index and an FAQ text table through
// the traits below; Supabase serves both remotely, SQLite + LanceDB locally.

pub mod import;
pub mod lancedb;
pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{BackendKind, Config};
use crate::search::FaqMetadata;
use crate::{FaqError, Result};

pub const FAQ_DATA_TYPE: &str = "faq";

/// Metadata attached to a row returned by `match_documents`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    pub upsert_key: String,
    pub data_type: String,
    pub source_doc_name: String,
    /// Either a JSON object or a JSON-encoded string.
    pub custom_metadata_from_db: Option<serde_json::Value>,
}

/// Raw similarity-search row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedDocument {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// Named `similarity` upstream, but it holds a distance.
    #[serde(rename = "similarity")]
    pub distance: f32,
}

/// Raw row from the FAQ table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqRow {
    pub upsert_key: String,
    pub content: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub source_doc_name: String,
    #[serde(default)]
    pub custom_metadata: Option<serde_json::Value>,
}

fn default_data_type() -> String {
    FAQ_DATA_TYPE.to_string()
}

/// An FAQ entry ready to be written to the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct FaqDocument {
    pub upsert_key: String,
    pub source_doc_name: String,
    pub metadata: FaqMetadata,
}

impl FaqDocument {
    /// Text that gets embedded and substring-matched.
    #[inline]
    pub fn content(&self) -> String {
        format!("Q: {}\nA: {}", self.metadata.question, self.metadata.answer)
    }

    #[inline]
    pub fn to_row(&self) -> Result<FaqRow> {
        Ok(FaqRow {
            upsert_key: self.upsert_key.clone(),
            content: self.content(),
            data_type: FAQ_DATA_TYPE.to_string(),
            source_doc_name: self.source_doc_name.clone(),
            custom_metadata: Some(serde_json::to_value(&self.metadata)?),
        })
    }
}

/// Similarity search over FAQ embeddings, filtered to `data_type = 'faq'`.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn match_documents(
        &self,
        embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>>;
}

/// Case-insensitive substring search over the FAQ table's `content` column.
#[async_trait]
pub trait FaqTextStore: Send + Sync {
    /// Rows whose content contains any of `terms`, at most `limit` of them.
    async fn search_terms(&self, terms: &[String], limit: usize) -> Result<Vec<FaqRow>>;
}

/// The vector index and text store selected by configuration.
pub struct Backends {
    pub vector_index: Arc<dyn VectorIndex>,
    pub text_store: Arc<dyn FaqTextStore>,
}

impl Backends {
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        match config.backend.kind {
            BackendKind::Supabase => {
                let client = Arc::new(supabase::SupabaseClient::new(config)?);
                Ok(Self {
                    vector_index: Arc::clone(&client) as Arc<dyn VectorIndex>,
                    text_store: client,
                })
            }
            BackendKind::Local => {
                let database = sqlite::Database::initialize_from_config(config)
                    .await
                    .map_err(|e| FaqError::Database(format!("{:#}", e)))?;
                let vectors = lancedb::LanceVectorIndex::open(config).await?;
                Ok(Self {
                    vector_index: Arc::new(vectors),
                    text_store: Arc::new(database),
                })
            }
        }
    }
}
