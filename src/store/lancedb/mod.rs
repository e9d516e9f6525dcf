// LanceDB vector index
// Local stand-in for the hosted `match_documents` RPC


use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{DocumentMetadata, FAQ_DATA_TYPE, FaqRow, MatchedDocument, VectorIndex};
use crate::config::Config;
use crate::{FaqError, Result};

pub const TABLE_NAME: &str = "faq_embeddings";

/// An FAQ row together with its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct FaqEmbedding {
    pub row: FaqRow,
    pub vector: Vec<f32>,
}

pub struct LanceVectorIndex {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

impl LanceVectorIndex {
    #[inline]
    pub async fn open(config: &Config) -> Result<Self> {
        Self::open_at(
            &config.vector_database_path(),
            config.embeddings.dimensions as usize,
        )
        .await
    }

    /// Open (creating if needed) the index stored under `path`.
    #[inline]
    pub async fn open_at(path: &Path, dimension: usize) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            FaqError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", path.display());
        debug!("Connecting to LanceDB at {}", uri);
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let index = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            dimension,
        };
        index.ensure_table().await?;
        Ok(index)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_table(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            let existing = self.existing_dimension().await?;
            if existing != self.dimension {
                return Err(FaqError::Database(format!(
                    "Table {} holds {}-dimensional vectors but {} are configured",
                    self.table_name, existing, self.dimension
                )));
            }
            return Ok(());
        }

        info!(
            "Creating {} table with {} dimensions",
            self.table_name, self.dimension
        );
        self.connection
            .create_empty_table(&self.table_name, self.schema())
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    async fn existing_dimension(&self) -> Result<usize> {
        let schema = self
            .open_table()
            .await?
            .schema()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to get table schema: {}", e)))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => Some(*size as usize),
                _ => None,
            })
            .ok_or_else(|| FaqError::Database("Could not determine vector dimension".to_string()))
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("upsert_key", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("data_type", DataType::Utf8, false),
            Field::new("source_doc_name", DataType::Utf8, false),
            Field::new("custom_metadata", DataType::Utf8, true),
        ]))
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to open table: {}", e)))
    }

    /// Replace any rows sharing an `upsert_key` with the given embeddings.
    #[inline]
    pub async fn upsert(&self, embeddings: &[FaqEmbedding]) -> Result<()> {
        if embeddings.is_empty() {
            return Ok(());
        }

        if let Some(bad) = embeddings
            .iter()
            .find(|embedding| embedding.vector.len() != self.dimension)
        {
            return Err(FaqError::Embedding(format!(
                "Embedding for {} has {} dimensions, expected {}",
                bad.row.upsert_key,
                bad.vector.len(),
                self.dimension
            )));
        }

        let table = self.open_table().await?;

        let keys: Vec<String> = embeddings
            .iter()
            .map(|embedding| format!("'{}'", embedding.row.upsert_key.replace('\'', "''")))
            .collect();
        table
            .delete(&format!("upsert_key IN ({})", keys.join(", ")))
            .await
            .map_err(|e| FaqError::Database(format!("Failed to delete stale rows: {}", e)))?;

        let batch = self.record_batch(embeddings)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to insert embeddings: {}", e)))?;

        debug!("Stored {} FAQ embeddings", embeddings.len());
        Ok(())
    }

    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let count = self
            .open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| FaqError::Database(format!("Failed to count rows: {}", e)))?;
        Ok(count as u64)
    }

    fn record_batch(&self, embeddings: &[FaqEmbedding]) -> Result<RecordBatch> {
        let mut flat_values = Vec::with_capacity(embeddings.len() * self.dimension);
        for embedding in embeddings {
            flat_values.extend_from_slice(&embedding.vector);
        }

        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vectors = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| FaqError::Database(format!("Failed to create vector array: {}", e)))?;

        let metadata: Vec<Option<String>> = embeddings
            .iter()
            .map(|embedding| {
                embedding
                    .row
                    .custom_metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()
            })
            .collect::<std::result::Result<_, _>>()?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from_iter_values(
                embeddings.iter().map(|e| e.row.upsert_key.as_str()),
            )),
            Arc::new(vectors),
            Arc::new(StringArray::from_iter_values(
                embeddings.iter().map(|e| e.row.content.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                embeddings.iter().map(|e| e.row.data_type.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                embeddings.iter().map(|e| e.row.source_doc_name.as_str()),
            )),
            Arc::new(StringArray::from(metadata)),
        ];

        RecordBatch::try_new(self.schema(), arrays)
            .map_err(|e| FaqError::Database(format!("Failed to create record batch: {}", e)))
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn match_documents(
        &self,
        embedding: &[f32],
        match_count: usize,
    ) -> Result<Vec<MatchedDocument>> {
        let table = self.open_table().await?;
        let mut stream = table
            .vector_search(embedding)
            .map_err(|e| FaqError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .only_if(format!("data_type = '{}'", FAQ_DATA_TYPE))
            .limit(match_count)
            .execute()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to execute search: {}", e)))?;

        let mut documents = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| FaqError::Database(format!("Failed to read result stream: {}", e)))?
        {
            documents.extend(parse_batch(&batch)?);
        }

        debug!("LanceDB returned {} documents", documents.len());
        Ok(documents)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| FaqError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| FaqError::Database(format!("Invalid {} column type", name)))
}

fn parse_batch(batch: &RecordBatch) -> Result<Vec<MatchedDocument>> {
    let keys = string_column(batch, "upsert_key")?;
    let contents = string_column(batch, "content")?;
    let data_types = string_column(batch, "data_type")?;
    let sources = string_column(batch, "source_doc_name")?;
    let metadata = string_column(batch, "custom_metadata")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    Ok((0..batch.num_rows())
        .map(|row| MatchedDocument {
            content: contents.value(row).to_string(),
            metadata: DocumentMetadata {
                upsert_key: keys.value(row).to_string(),
                data_type: data_types.value(row).to_string(),
                source_doc_name: sources.value(row).to_string(),
                custom_metadata_from_db: (!metadata.is_null(row))
                    .then(|| serde_json::Value::String(metadata.value(row).to_string())),
            },
            distance: distances
                .filter(|d| !d.is_null(row))
                .map_or(f32::INFINITY, |d| d.value(row)),
        })
        .collect())
}
