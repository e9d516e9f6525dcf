use super::*;
use serial_test::serial;

fn endpoint() -> Url {
    Url::parse("http://localhost:9/v1/embeddings").expect("valid url")
}

#[test]
fn client_configuration() {
    let client = OpenAiEmbeddingClient::with_endpoint(
        endpoint(),
        "text-embedding-3-small".to_string(),
        1536,
        "sk-test".to_string(),
    );

    assert_eq!(client.model(), "text-embedding-3-small");
    assert_eq!(client.dimensions(), 1536);
    assert_eq!(client.endpoint().path(), "/v1/embeddings");
}

#[test]
fn request_serialization() {
    let request = EmbeddingRequest {
        model: "text-embedding-3-small",
        input: "how much protein",
        dimensions: 1536,
    };
    let value = serde_json::to_value(&request).expect("serializes");
    assert_eq!(
        value,
        serde_json::json!({
            "model": "text-embedding-3-small",
            "input": "how much protein",
            "dimensions": 1536
        })
    );
}

#[test]
#[serial]
fn new_reads_api_key_from_configured_env() {
    let mut config = Config::default();
    config.embeddings.api_key_env = "COACH_FAQ_TEST_EMBED_KEY".to_string();

    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::remove_var("COACH_FAQ_TEST_EMBED_KEY") };
    assert!(matches!(
        OpenAiEmbeddingClient::new(&config),
        Err(FaqError::Config(_))
    ));

    // SAFETY: see above
    unsafe { std::env::set_var("COACH_FAQ_TEST_EMBED_KEY", "sk-live") };
    let client = OpenAiEmbeddingClient::new(&config).expect("client builds");
    assert_eq!(client.endpoint().as_str(), "https://api.openai.com/v1/embeddings");

    // SAFETY: see above
    unsafe { std::env::remove_var("COACH_FAQ_TEST_EMBED_KEY") };
}

#[test]
#[serial]
fn new_applies_configured_embedding_timeout() {
    let mut config = Config::default();
    config.embeddings.api_key_env = "COACH_FAQ_TEST_EMBED_TIMEOUT_KEY".to_string();
    config.search.timeouts.embedding_secs = 3;

    // SAFETY: serialized with every other test touching the environment
    unsafe { std::env::set_var("COACH_FAQ_TEST_EMBED_TIMEOUT_KEY", "sk-live") };
    let client = OpenAiEmbeddingClient::new(&config).expect("client builds");
    assert_eq!(client.timeout(), Duration::from_secs(3));

    // SAFETY: see above
    unsafe { std::env::remove_var("COACH_FAQ_TEST_EMBED_TIMEOUT_KEY") };
}

#[test]
fn unreachable_endpoint_is_a_network_error() {
    let client = OpenAiEmbeddingClient::with_endpoint(
        endpoint(),
        "m".to_string(),
        64,
        "k".to_string(),
    )
    .with_timeout(Duration::from_secs(2));

    let err = client.generate_embedding("hi").expect_err("port 9 is closed");
    assert!(matches!(err, FaqError::Network(_) | FaqError::Timeout(_)));
}
