#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Import into the local SQLite + LanceDB backend and search it

use anyhow::Result;
use async_trait::async_trait;
use coach_faq::FaqError;
use coach_faq::cache::SearchCaches;
use coach_faq::config::{BackendKind, Config};
use coach_faq::embeddings::EmbeddingProvider;
use coach_faq::search::{ExpansionPolicy, FaqSearcher, SearchPath};
use coach_faq::store::Backends;
use coach_faq::store::import::{ImportSummary, import_documents, load_entries};
use coach_faq::store::lancedb::LanceVectorIndex;
use coach_faq::store::sqlite::Database;
use indicatif::ProgressBar;
use std::sync::Arc;
use tempfile::TempDir;

const FAQS: &str = r#"[
    {
        "question": "How much protein should I eat per day?",
        "answer": "Aim for 1.6-2.2 g of protein per kg of bodyweight.",
        "source": "nutrition"
    },
    {
        "question": "How many hours of sleep do I need?",
        "answer": "Most lifters recover best on seven to nine hours of sleep.",
        "source": "recovery"
    },
    {
        "question": "Should I take creatine?",
        "answer": "Take 3-5 g of creatine monohydrate daily.",
        "source": "supplements"
    }
]"#;

/// One axis per topic so nearest neighbours are predictable.
struct TopicEmbedder;

#[async_trait]
impl EmbeddingProvider for TopicEmbedder {
    async fn embed(&self, text: &str) -> coach_faq::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        if lower.contains("offline") {
            return Err(FaqError::Network("embedding service unreachable".to_string()));
        }
        Ok(vec![
            f32::from(u8::from(lower.contains("protein"))),
            f32::from(u8::from(lower.contains("sleep"))),
            f32::from(u8::from(lower.contains("creatine"))),
            0.1,
        ])
    }

    fn model(&self) -> &str {
        "topic"
    }
}

fn local_config(temp_dir: &TempDir) -> Config {
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.backend.kind = BackendKind::Local;
    config.embeddings.dimensions = 4;
    config
}

async fn import_fixture(config: &Config, temp_dir: &TempDir) -> Result<ImportSummary> {
    let file = temp_dir.path().join("faqs.json");
    std::fs::write(&file, FAQS)?;

    let documents = load_entries(&file)?;
    let database = Database::initialize_from_config(config).await?;
    let index = LanceVectorIndex::open(config).await?;

    Ok(import_documents(
        &documents,
        &TopicEmbedder,
        &database,
        &index,
        &ProgressBar::hidden(),
    )
    .await?)
}

async fn local_searcher(config: &Config) -> Result<FaqSearcher> {
    let backends = Backends::from_config(config).await?;
    Ok(FaqSearcher::new(
        Arc::new(TopicEmbedder),
        backends.vector_index,
        backends.text_store,
        Arc::new(SearchCaches::new(&config.search.cache)),
        config.search.clone(),
    ))
}

#[tokio::test]
async fn imported_faqs_are_found_by_vector_search() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = local_config(&temp_dir);

    let summary = import_fixture(&config, &temp_dir).await?;
    assert_eq!(summary, ImportSummary { imported: 3, failed: 0 });

    let searcher = local_searcher(&config).await?;
    let outcome = searcher
        .search_with_outcome("how much protein per day", 3, ExpansionPolicy::Never)
        .await;

    assert_eq!(outcome.path, SearchPath::Vector);
    let top = &outcome.results[0];
    assert_eq!(
        top.custom_metadata.question,
        "How much protein should I eat per day?"
    );
    assert_eq!(top.source_doc_name, "nutrition");
    assert_eq!(top.data_type, "faq");
    assert!(top.similarity > 0.9);
    assert!(
        outcome.results[1..]
            .iter()
            .all(|result| result.similarity < top.similarity)
    );

    Ok(())
}

#[tokio::test]
async fn reimport_replaces_rather_than_duplicates() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = local_config(&temp_dir);

    import_fixture(&config, &temp_dir).await?;
    import_fixture(&config, &temp_dir).await?;

    let database = Database::new(config.database_path()).await?;
    assert_eq!(database.count_faqs().await?, 3);
    let index = LanceVectorIndex::open(&config).await?;
    assert_eq!(index.count().await?, 3);

    Ok(())
}

#[tokio::test]
async fn embedding_outage_uses_sqlite_text_search() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = local_config(&temp_dir);
    import_fixture(&config, &temp_dir).await?;

    let searcher = local_searcher(&config).await?;
    let outcome = searcher
        .search_with_outcome("offline: creatine monohydrate", 5, ExpansionPolicy::Always)
        .await;

    assert_eq!(outcome.path, SearchPath::TextFallback);
    assert!(outcome.reranked);
    assert_eq!(
        outcome.results[0].custom_metadata.question,
        "Should I take creatine?"
    );

    Ok(())
}

#[tokio::test]
async fn empty_local_store_returns_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = local_config(&temp_dir);

    let searcher = local_searcher(&config).await?;
    let results = searcher
        .search("how much protein per day", 5, ExpansionPolicy::Conditional)
        .await;
    assert!(results.is_empty());
    assert_eq!(searcher.caches().results.len(), 1);

    let repeat = searcher
        .search_with_outcome("how much protein per day", 5, ExpansionPolicy::Conditional)
        .await;
    assert!(repeat.results.is_empty());
    assert_eq!(repeat.path, SearchPath::Cached);

    Ok(())
}
