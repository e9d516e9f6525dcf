//! Loading FAQ entries from JSON into the local backend.


use indicatif::ProgressBar;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use super::lancedb::{FaqEmbedding, LanceVectorIndex};
use super::sqlite::Database;
use super::FaqDocument;
use crate::embeddings::EmbeddingProvider;
use crate::search::FaqMetadata;
use crate::{FaqError, Result};

pub const DEFAULT_SOURCE: &str = "faq-import";

/// One entry of an import file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FaqImportEntry {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub upsert_key: Option<String>,
}

impl FaqImportEntry {
    #[inline]
    pub fn into_document(self) -> Result<FaqDocument> {
        let question = self.question.trim().to_string();
        let answer = self.answer.trim().to_string();
        if question.is_empty() || answer.is_empty() {
            return Err(FaqError::Parse(
                "FAQ entries need a non-empty question and answer".to_string(),
            ));
        }

        let upsert_key = self
            .upsert_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| derive_upsert_key(&question));

        Ok(FaqDocument {
            upsert_key,
            source_doc_name: self.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            metadata: FaqMetadata { question, answer },
        })
    }
}

/// Stable key for a question: UUID v5 of its normalized text.
#[inline]
pub fn derive_upsert_key(question: &str) -> String {
    let normalized = question.split_whitespace().join(" ").to_lowercase();
    Uuid::new_v5(&Uuid::NAMESPACE_OID, normalized.as_bytes()).to_string()
}

/// Parse a JSON array of entries, keeping the first entry for each key.
#[inline]
pub fn parse_entries(json: &str) -> Result<Vec<FaqDocument>> {
    let entries: Vec<FaqImportEntry> = serde_json::from_str(json)?;
    let documents = entries
        .into_iter()
        .map(FaqImportEntry::into_document)
        .collect::<Result<Vec<_>>>()?;

    Ok(documents
        .into_iter()
        .unique_by(|document| document.upsert_key.clone())
        .collect())
}

#[inline]
pub fn load_entries(path: &Path) -> Result<Vec<FaqDocument>> {
    let content = std::fs::read_to_string(path)?;
    parse_entries(&content)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub failed: usize,
}

/// Embed each document and write it to both local stores.
///
/// Documents whose embedding fails are skipped and counted. Rows are written
/// to SQLite before the vector index, so a failed index write leaves them
/// searchable by text.
pub async fn import_documents(
    documents: &[FaqDocument],
    embedder: &dyn EmbeddingProvider,
    database: &Database,
    index: &LanceVectorIndex,
    progress: &ProgressBar,
) -> Result<ImportSummary> {
    progress.set_length(documents.len() as u64);

    let mut summary = ImportSummary::default();
    let mut rows = Vec::with_capacity(documents.len());
    let mut embeddings = Vec::with_capacity(documents.len());

    for document in documents {
        progress.set_message(document.metadata.question.clone());
        let row = document.to_row()?;

        match embedder.embed(&row.content).await {
            Ok(vector) => {
                rows.push(row.clone());
                embeddings.push(FaqEmbedding { row, vector });
                summary.imported += 1;
            }
            Err(e) => {
                warn!("Skipping FAQ {}: {}", document.upsert_key, e);
                summary.failed += 1;
            }
        }
        progress.inc(1);
    }

    // SQLite first: a failed index write still leaves the rows text-searchable
    database
        .upsert_faqs(&rows)
        .await
        .map_err(|e| FaqError::Database(format!("{:#}", e)))?;
    if let Err(e) = index.upsert(&embeddings).await {
        warn!(
            "Stored {} FAQs in SQLite but the vector index was not updated: {}",
            rows.len(),
            e
        );
        return Err(e);
    }

    progress.finish_and_clear();
    info!(
        "Imported {} FAQs ({} failed)",
        summary.imported, summary.failed
    );
    Ok(summary)
}
