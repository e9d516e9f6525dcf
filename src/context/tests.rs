use super::*;
use crate::cache::SearchCaches;
use crate::config::SearchConfig;
use crate::embeddings::EmbeddingProvider;
use crate::search::FaqMetadata;
use crate::store::{DocumentMetadata, FaqRow, FaqTextStore, MatchedDocument, VectorIndex};
use crate::{FaqError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

fn result(key: &str, question: &str, answer: &str) -> FaqResult {
    FaqResult {
        upsert_key: key.to_string(),
        content: format!("Q: {question}\nA: {answer}"),
        data_type: "faq".to_string(),
        source_doc_name: "coaching-faq".to_string(),
        custom_metadata: FaqMetadata {
            question: question.to_string(),
            answer: answer.to_string(),
        },
        similarity: 0.9,
    }
}

struct FixedEmbedder {
    fail: bool,
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(FaqError::Network("offline".to_string()));
        }
        Ok(vec![0.5; 4])
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

struct OneDocumentIndex;

#[async_trait]
impl VectorIndex for OneDocumentIndex {
    async fn match_documents(&self, _: &[f32], _: usize) -> Result<Vec<MatchedDocument>> {
        Ok(vec![MatchedDocument {
            content: "Q: Is creatine safe?\nA: Yes, at 3-5 g per day.".to_string(),
            metadata: DocumentMetadata {
                upsert_key: "faq-creatine".to_string(),
                data_type: "faq".to_string(),
                source_doc_name: "supplements".to_string(),
                custom_metadata_from_db: Some(json!({
                    "question": "Is creatine safe?",
                    "answer": "Yes, at 3-5 g per day."
                })),
            },
            distance: 0.1,
        }])
    }
}

struct EmptyText;

#[async_trait]
impl FaqTextStore for EmptyText {
    async fn search_terms(&self, _: &[String], _: usize) -> Result<Vec<FaqRow>> {
        Ok(Vec::new())
    }
}

fn searcher(embedding_fails: bool) -> FaqSearcher {
    FaqSearcher::new(
        Arc::new(FixedEmbedder {
            fail: embedding_fails,
        }),
        Arc::new(OneDocumentIndex),
        Arc::new(EmptyText),
        Arc::new(SearchCaches::default()),
        SearchConfig::default(),
    )
}

#[test]
fn empty_results_render_nothing() {
    assert_eq!(format_faq_context(&[]), "");
}

#[test]
fn results_are_numbered_with_sources() {
    let text = format_faq_context(&[
        result("a", "How much protein?", "1.6-2.2 g/kg."),
        result("b", "  Creatine? ", "3-5 g daily."),
    ]);

    assert_eq!(
        text,
        "## Relevant FAQs\n\n\
         1. Q: How much protein?\n   A: 1.6-2.2 g/kg.\n   Source: coaching-faq\n\n\
         2. Q: Creatine?\n   A: 3-5 g daily.\n   Source: coaching-faq"
    );
}

#[test]
fn verbosity_follows_intent() {
    assert_eq!(
        verbosity_for(&classify_intent("compare whey vs creatine")),
        Verbosity::Detailed
    );
    assert_eq!(
        verbosity_for(&classify_intent("refund my order")),
        Verbosity::Minimal
    );
    assert_eq!(
        verbosity_for(&classify_intent("creatine")),
        Verbosity::Standard
    );
}

#[tokio::test]
async fn context_combines_faqs_and_products() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;
    let context =
        AssistantContext::build("Compare whey vs creatine", &searcher(false), &catalog).await;

    assert_eq!(context.intent.kind, IntentKind::Comparison);
    assert_eq!(context.faqs.len(), 1);
    assert_eq!(
        context.route.product_ids,
        vec!["supp-whey-isolate", "supp-creatine"]
    );

    let rendered = context.render();
    assert!(rendered.starts_with("## Relevant FAQs"));
    assert!(rendered.contains("Q: Is creatine safe?"));
    assert!(rendered.contains("## Suggested products (amazon)"));
    assert!(rendered.contains("ID: supp-creatine"));
    Ok(())
}

#[tokio::test]
async fn general_question_without_faqs_renders_empty() -> Result<()> {
    let catalog = ProductCatalog::builtin()?;
    let context = AssistantContext::build(
        "How long should I rest between sets?",
        &searcher(true),
        &catalog,
    )
    .await;

    assert!(context.faqs.is_empty());
    assert!(context.route.product_ids.is_empty());
    assert_eq!(context.render(), "");
    Ok(())
}
