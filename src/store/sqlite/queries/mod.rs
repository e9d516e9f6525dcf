
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::store::{FAQ_DATA_TYPE, FaqRow};

/// A row of the `faqs` table as stored.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FaqRecord {
    pub upsert_key: String,
    pub content: String,
    pub data_type: String,
    pub source_doc_name: String,
    pub custom_metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FaqRecord {
    /// Metadata text that is not valid JSON is passed on as a JSON string,
    /// which downstream parsing turns into a placeholder.
    #[inline]
    pub fn into_row(self) -> FaqRow {
        let custom_metadata = self.custom_metadata.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });
        FaqRow {
            upsert_key: self.upsert_key,
            content: self.content,
            data_type: self.data_type,
            source_doc_name: self.source_doc_name,
            custom_metadata,
        }
    }
}

pub struct FaqQueries;

impl FaqQueries {
    /// Insert or replace rows keyed by `upsert_key`; returns the number written.
    #[inline]
    pub async fn upsert_many(pool: &SqlitePool, rows: &[FaqRow]) -> Result<u64> {
        let now = Utc::now();
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        let mut written = 0;

        for row in rows {
            let metadata = row
                .custom_metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("Failed to serialize FAQ metadata")?;

            written += sqlx::query(
                r#"
                INSERT INTO faqs (upsert_key, content, data_type, source_doc_name, custom_metadata, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(upsert_key) DO UPDATE SET
                    content = excluded.content,
                    data_type = excluded.data_type,
                    source_doc_name = excluded.source_doc_name,
                    custom_metadata = excluded.custom_metadata,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&row.upsert_key)
            .bind(&row.content)
            .bind(&row.data_type)
            .bind(&row.source_doc_name)
            .bind(metadata)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to upsert FAQ {}", row.upsert_key))?
            .rows_affected();
        }

        tx.commit().await.context("Failed to commit FAQ upsert")?;
        debug!("Upserted {} FAQ rows", written);
        Ok(written)
    }

    #[inline]
    pub async fn get_by_key(pool: &SqlitePool, upsert_key: &str) -> Result<Option<FaqRecord>> {
        sqlx::query_as::<_, FaqRecord>("SELECT * FROM faqs WHERE upsert_key = ?")
            .bind(upsert_key)
            .fetch_optional(pool)
            .await
            .context("Failed to get FAQ by key")
    }

    #[inline]
    pub async fn list(pool: &SqlitePool, limit: usize) -> Result<Vec<FaqRecord>> {
        sqlx::query_as::<_, FaqRecord>(
            "SELECT * FROM faqs WHERE data_type = ? ORDER BY created_at, upsert_key LIMIT ?",
        )
        .bind(FAQ_DATA_TYPE)
        .bind(limit as i64)
        .fetch_all(pool)
        .await
        .context("Failed to list FAQs")
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM faqs WHERE data_type = ?")
            .bind(FAQ_DATA_TYPE)
            .fetch_one(pool)
            .await
            .context("Failed to count FAQs")
    }

    #[inline]
    pub async fn delete(pool: &SqlitePool, upsert_key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM faqs WHERE upsert_key = ?")
            .bind(upsert_key)
            .execute(pool)
            .await
            .context("Failed to delete FAQ")?;
        Ok(result.rows_affected() > 0)
    }

    /// FAQ rows whose content contains any of `terms` (ASCII case-insensitive).
    #[inline]
    pub async fn search_content(
        pool: &SqlitePool,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<FaqRecord>> {
        let patterns: Vec<String> = terms
            .iter()
            .filter(|term| !term.trim().is_empty())
            .map(|term| format!("%{}%", escape_like(term.trim())))
            .collect();
        if patterns.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM faqs WHERE data_type = ");
        builder.push_bind(FAQ_DATA_TYPE).push(" AND (");
        for (i, pattern) in patterns.into_iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push("content LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\'");
        }
        builder
            .push(") ORDER BY created_at, upsert_key LIMIT ")
            .push_bind(limit as i64);

        builder
            .build_query_as::<FaqRecord>()
            .fetch_all(pool)
            .await
            .context("Failed to search FAQ content")
    }
}

/// Escape LIKE wildcards so terms match literally.
#[inline]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
