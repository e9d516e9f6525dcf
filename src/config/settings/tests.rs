use super::*;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embeddings.model, "text-embedding-3-small");
    assert_eq!(config.embeddings.dimensions, 1536);
    assert_eq!(config.backend.kind, BackendKind::Supabase);
    assert_eq!(config.supabase.rpc_function, "match_documents");
    assert_eq!(config.search.max_match_count, 50);
    assert_eq!(config.search.timeouts.embedding(), Duration::from_secs(10));
    assert_eq!(config.search.timeouts.vector(), Duration::from_secs(8));
    assert_eq!(config.search.timeouts.text(), Duration::from_secs(5));
    assert_eq!(config.search.cache.embedding_ttl_secs, 300);
    assert_eq!(config.search.cache.results_ttl_secs, 120);
    assert_eq!(config.search.cache.expansion_ttl_secs, 600);
    assert_eq!(config.search.cache.sweep_interval_secs, 300);
}

#[test]
fn config_validation() {
    let config = Config::default();
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.embeddings.base_url = "ftp://example.com".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embeddings.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embeddings.dimensions = 10;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.search.max_match_count = 51;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.search.timeouts.vector_secs = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.search.cache.results_ttl_secs = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.search.thresholds.expand_top_similarity = 1.5;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.supabase.faq_table = "faqs; drop table".to_string();
    assert!(invalid_config.validate().is_err());
}

#[test]
fn supabase_settings_ignored_for_local_backend() {
    let mut config = Config::default();
    config.backend.kind = BackendKind::Local;
    config.supabase.url = "not a url".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn endpoint_url_generation() {
    let config = Config::default();
    let url = config
        .embeddings
        .endpoint_url()
        .expect("should generate embeddings url");
    assert_eq!(url.as_str(), "https://api.openai.com/v1/embeddings");

    let rest = config
        .supabase
        .rest_url()
        .expect("should generate rest url");
    assert_eq!(rest.as_str(), "http://localhost:54321/rest/v1/");
}

#[test]
fn endpoint_url_tolerates_trailing_slash() {
    let mut config = EmbeddingConfig::default();
    config
        .set_base_url("http://127.0.0.1:9000/v1/".to_string())
        .expect("valid url");
    let url = config.endpoint_url().expect("url");
    assert_eq!(url.as_str(), "http://127.0.0.1:9000/v1/embeddings");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [backend]
        kind = "local"

        [search]
        expansion_policy = "always"
        distance_metric = "cosine"
        "#,
    )
    .expect("should parse partial toml");

    assert_eq!(parsed.backend.kind, BackendKind::Local);
    assert_eq!(parsed.search.expansion_policy, ExpansionPolicy::Always);
    assert_eq!(parsed.search.distance_metric, DistanceMetric::Cosine);
    assert_eq!(parsed.search.default_limit, 5);
    assert_eq!(parsed.embeddings, EmbeddingConfig::default());
}

#[test]
fn setter_validation() {
    let mut embeddings = EmbeddingConfig::default();
    assert!(embeddings.set_model("text-embedding-3-large".to_string()).is_ok());
    assert!(embeddings.set_dimensions(3072).is_ok());
    assert!(embeddings.set_api_key_env("MY_KEY".to_string()).is_ok());

    assert!(embeddings.set_model("  ".to_string()).is_err());
    assert!(embeddings.set_dimensions(8192).is_err());
    assert!(embeddings.set_api_key_env("lower-case".to_string()).is_err());
    assert!(embeddings.set_base_url("not a url".to_string()).is_err());

    let mut supabase = SupabaseConfig::default();
    assert!(supabase.set_url("https://abc.supabase.co".to_string()).is_ok());
    assert!(supabase.set_faq_table("faq_documents".to_string()).is_ok());
    assert!(supabase.set_faq_table("faq documents".to_string()).is_err());

    let mut search = SearchConfig::default();
    assert!(search.set_default_limit(10).is_ok());
    assert!(search.set_default_limit(0).is_err());
    assert!(search.set_default_limit(51).is_err());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.backend.kind = BackendKind::Local;
    config.search.default_limit = 8;
    config.save().expect("should save config");

    let loaded = Config::load(temp_dir.path()).expect("should load saved config");
    assert_eq!(loaded, config);
    assert_eq!(loaded.get_base_dir(), temp_dir.path());
    assert_eq!(loaded.database_path(), temp_dir.path().join("faqs.db"));
    assert_eq!(loaded.vector_database_path(), temp_dir.path().join("vectors"));
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[search]\ndefault_limit = 0\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
#[serial]
fn api_key_read_from_environment() {
    let mut config = EmbeddingConfig::default();
    config.api_key_env = "COACH_FAQ_TEST_EMBEDDING_KEY".to_string();

    // SAFETY: serialized with the other environment tests
    unsafe { std::env::remove_var("COACH_FAQ_TEST_EMBEDDING_KEY") };
    assert!(matches!(
        config.api_key(),
        Err(ConfigError::MissingApiKey(_))
    ));

    // SAFETY: serialized with the other environment tests
    unsafe { std::env::set_var("COACH_FAQ_TEST_EMBEDDING_KEY", "sk-test") };
    assert_eq!(config.api_key().expect("key is set"), "sk-test");

    // SAFETY: serialized with the other environment tests
    unsafe { std::env::remove_var("COACH_FAQ_TEST_EMBEDDING_KEY") };
}

#[test]
#[serial]
fn default_dir_honours_environment_override() {
    // SAFETY: serialized with the other environment tests
    unsafe { std::env::set_var(CONFIG_DIR_ENV, "/tmp/coach-faq-test-home") };
    let dir = Config::default_dir().expect("dir resolves");
    assert_eq!(dir, PathBuf::from("/tmp/coach-faq-test-home"));

    // SAFETY: serialized with the other environment tests
    unsafe { std::env::remove_var(CONFIG_DIR_ENV) };
}
