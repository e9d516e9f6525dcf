#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Supabase PostgREST client against a mock server

use coach_faq::FaqError;
use coach_faq::store::supabase::SupabaseClient;
use coach_faq::store::{FaqTextStore, VectorIndex};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> SupabaseClient {
    let rest_url = Url::parse(&format!("{}/rest/v1/", server.uri())).expect("valid url");
    SupabaseClient::with_rest_url(
        rest_url,
        "service-key".to_string(),
        "match_documents".to_string(),
        "faqs".to_string(),
    )
}

#[tokio::test]
async fn match_documents_posts_embedding_and_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/match_documents"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(body_json(json!({
            "query_embedding": [0.5, 0.5],
            "match_count": 3,
            "filter": { "data_type": "faq" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "content": "Q: How much protein?\nA: 1.6-2.2 g/kg.",
                "metadata": {
                    "upsert_key": "faq-protein",
                    "data_type": "faq",
                    "source_doc_name": "nutrition",
                    "custom_metadata_from_db": "{\"question\":\"How much protein?\",\"answer\":\"1.6-2.2 g/kg.\"}"
                },
                "similarity": 0.12
            },
            {
                "content": "Q: Sleep?\nA: Eight hours.",
                "metadata": { "upsert_key": "faq-sleep" },
                "similarity": 0.7
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let documents = client(&server)
        .match_documents(&[0.5, 0.5], 3)
        .await
        .expect("rpc succeeds");

    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].metadata.upsert_key, "faq-protein");
    assert!((documents[0].distance - 0.12).abs() < 1e-6);
    assert!(documents[0].metadata.custom_metadata_from_db.is_some());
    // Missing metadata fields fall back to defaults
    assert_eq!(documents[1].metadata.source_doc_name, "");
    assert!(documents[1].metadata.custom_metadata_from_db.is_none());
}

#[tokio::test]
async fn rpc_failure_is_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/match_documents"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "code": "XX000",
            "message": "function match_documents does not exist"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .match_documents(&[0.1], 5)
        .await
        .expect_err("500 is an error");
    assert!(matches!(err, FaqError::Upstream { status: 500, .. }));
}

#[tokio::test]
async fn text_search_sends_or_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/faqs"))
        .and(query_param("data_type", "eq.faq"))
        .and(query_param("or", "(content.ilike.*protein*,content.ilike.*intake*)"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "upsert_key": "faq-protein",
                "content": "Q: How much protein?\nA: 1.6-2.2 g/kg.",
                "data_type": "faq",
                "source_doc_name": "nutrition",
                "custom_metadata": { "question": "How much protein?", "answer": "1.6-2.2 g/kg." }
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = client(&server)
        .search_terms(&["protein".to_string(), "intake".to_string()], 5)
        .await
        .expect("text search succeeds");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].upsert_key, "faq-protein");
    assert_eq!(rows[0].source_doc_name, "nutrition");
}

#[tokio::test]
async fn text_search_without_terms_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let rows = client(&server)
        .search_terms(&[], 5)
        .await
        .expect("no-op succeeds");
    assert!(rows.is_empty());
}

#[tokio::test]
async fn malformed_rows_are_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/faqs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "not": "an array" })))
        .mount(&server)
        .await;

    let err = client(&server)
        .search_terms(&["protein".to_string()], 5)
        .await
        .expect_err("object is not a row list");
    assert!(matches!(err, FaqError::Parse(_)));
}
