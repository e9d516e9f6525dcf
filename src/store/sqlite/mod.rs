use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::config::Config;
use crate::store::{FaqRow, FaqTextStore};
use crate::FaqError;


pub mod queries;

pub use queries::{FaqQueries, FaqRecord};

pub type DbPool = Pool<Sqlite>;

/// Local FAQ table backed by SQLite.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/store/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    pub async fn initialize_from_config(config: &Config) -> Result<Self> {
        let config_dir = config.get_base_dir();
        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(config.database_path()).await
    }

    pub async fn upsert_faqs(&self, rows: &[FaqRow]) -> Result<u64> {
        FaqQueries::upsert_many(&self.pool, rows).await
    }

    pub async fn count_faqs(&self) -> Result<i64> {
        FaqQueries::count(&self.pool).await
    }

    pub async fn list_faqs(&self, limit: usize) -> Result<Vec<FaqRow>> {
        Ok(FaqQueries::list(&self.pool, limit)
            .await?
            .into_iter()
            .map(FaqRecord::into_row)
            .collect())
    }

    pub async fn get_faq(&self, upsert_key: &str) -> Result<Option<FaqRow>> {
        Ok(FaqQueries::get_by_key(&self.pool, upsert_key)
            .await?
            .map(FaqRecord::into_row))
    }

    pub async fn delete_faq(&self, upsert_key: &str) -> Result<bool> {
        FaqQueries::delete(&self.pool, upsert_key).await
    }
}

#[async_trait]
impl FaqTextStore for Database {
    async fn search_terms(&self, terms: &[String], limit: usize) -> crate::Result<Vec<FaqRow>> {
        let records = FaqQueries::search_content(&self.pool, terms, limit)
            .await
            .map_err(|e| FaqError::Database(format!("{:#}", e)))?;
        Ok(records.into_iter().map(FaqRecord::into_row).collect())
    }
}
