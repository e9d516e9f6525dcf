#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::search::rerank::RelevanceThresholds;
use crate::search::{DistanceMetric, ExpansionPolicy};

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const MAX_MATCH_COUNT: usize = 50;
pub const CONFIG_DIR_ENV: &str = "COACH_FAQ_HOME";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimensions: u32,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSION,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Supabase,
    Local,
}

impl std::fmt::Display for BackendKind {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            BackendKind::Supabase => write!(f, "supabase"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: String,
    /// Name of the environment variable holding the service key.
    pub api_key_env: String,
    pub rpc_function: String,
    pub faq_table: String,
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key_env: "SUPABASE_SERVICE_ROLE_KEY".to_string(),
            rpc_function: "match_documents".to_string(),
            faq_table: "faqs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    /// Upper bound on rows requested from the vector index.
    pub max_match_count: usize,
    pub max_expansions: usize,
    pub expansion_policy: ExpansionPolicy,
    pub distance_metric: DistanceMetric,
    pub timeouts: TimeoutConfig,
    pub thresholds: RelevanceThresholds,
    pub cache: CacheConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 5,
            max_match_count: MAX_MATCH_COUNT,
            max_expansions: 3,
            expansion_policy: ExpansionPolicy::Conditional,
            distance_metric: DistanceMetric::Legacy,
            timeouts: TimeoutConfig::default(),
            thresholds: RelevanceThresholds::default(),
            cache: CacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub embedding_secs: u64,
    pub vector_secs: u64,
    pub text_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_secs: 10,
            vector_secs: 8,
            text_secs: 5,
        }
    }
}

impl TimeoutConfig {
    #[inline]
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_secs)
    }

    #[inline]
    pub fn vector(&self) -> Duration {
        Duration::from_secs(self.vector_secs)
    }

    #[inline]
    pub fn text(&self) -> Duration {
        Duration::from_secs(self.text_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub embedding_ttl_secs: u64,
    pub results_ttl_secs: u64,
    pub expansion_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            embedding_ttl_secs: 300,
            results_ttl_secs: 120,
            expansion_ttl_secs: 600,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory of product JSON files; the built-in catalog is used when unset.
    pub path: Option<PathBuf>,
    pub format_ttl_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            format_ttl_secs: 600,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Environment variable {0} is not set")]
    MissingApiKey(String),
    #[error("Invalid environment variable name: {0:?}")]
    InvalidEnvName(String),
    #[error("Invalid table or function name: {0:?}")]
    InvalidIdentifier(String),
    #[error("Invalid {0} timeout: {1}s (must be between 1 and 120 seconds)")]
    InvalidTimeout(&'static str, u64),
    #[error("Invalid {0} TTL: {1}s (must be between 1 and 86400 seconds)")]
    InvalidTtl(&'static str, u64),
    #[error("Invalid default limit: {0} (must be between 1 and 50)")]
    InvalidLimit(usize),
    #[error("Invalid max match count: {0} (must be between 1 and 50)")]
    InvalidMatchCount(usize),
    #[error("Invalid max expansions: {0} (must be between 1 and 10)")]
    InvalidMaxExpansions(usize),
    #[error("Invalid threshold {0}: {1} (must be between 0.0 and 1.0)")]
    InvalidThreshold(&'static str, f32),
    #[error("Invalid top-k window: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Resolve the default base directory: `$COACH_FAQ_HOME`, then `~/.coach-faq`.
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }

        dirs::home_dir()
            .map(|home| home.join(".coach-faq"))
            .or_else(|| dirs::data_dir().map(|data| data.join("coach-faq")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embeddings.validate()?;
        if self.backend.kind == BackendKind::Supabase {
            self.supabase.validate()?;
        }
        self.search.validate()?;
        self.catalog.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Path of the SQLite database backing the local FAQ table
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.get_base_dir().join("faqs.db")
    }

    /// Path of the LanceDB directory backing the local vector index
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vectors")
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(64..=4096).contains(&self.dimensions) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimensions));
        }

        validate_env_name(&self.api_key_env)
    }

    /// URL of the embeddings endpoint, `{base_url}/embeddings`.
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        join_path(&self.base_url, "embeddings")
    }

    pub fn api_key(&self) -> Result<String, ConfigError> {
        read_secret(&self.api_key_env)
    }

    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        join_path(&base_url, "embeddings")?;
        self.base_url = base_url;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_dimensions(&mut self, dimensions: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimensions) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimensions));
        }
        self.dimensions = dimensions;
        Ok(())
    }

    pub fn set_api_key_env(&mut self, name: String) -> Result<(), ConfigError> {
        validate_env_name(&name)?;
        self.api_key_env = name;
        Ok(())
    }
}

impl SupabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rest_url()?;
        validate_env_name(&self.api_key_env)?;
        validate_identifier(&self.rpc_function)?;
        validate_identifier(&self.faq_table)?;
        Ok(())
    }

    /// Base URL of the PostgREST API, `{url}/rest/v1/`.
    pub fn rest_url(&self) -> Result<Url, ConfigError> {
        join_path(&self.url, "rest/v1/")
    }

    pub fn api_key(&self) -> Result<String, ConfigError> {
        read_secret(&self.api_key_env)
    }

    pub fn set_url(&mut self, url: String) -> Result<(), ConfigError> {
        join_path(&url, "rest/v1/")?;
        self.url = url;
        Ok(())
    }

    pub fn set_faq_table(&mut self, table: String) -> Result<(), ConfigError> {
        validate_identifier(&table)?;
        self.faq_table = table;
        Ok(())
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_MATCH_COUNT).contains(&self.default_limit) {
            return Err(ConfigError::InvalidLimit(self.default_limit));
        }

        if !(1..=MAX_MATCH_COUNT).contains(&self.max_match_count) {
            return Err(ConfigError::InvalidMatchCount(self.max_match_count));
        }

        if !(1..=10).contains(&self.max_expansions) {
            return Err(ConfigError::InvalidMaxExpansions(self.max_expansions));
        }

        self.timeouts.validate()?;
        self.thresholds.validate()?;
        self.cache.validate()
    }

    pub fn set_default_limit(&mut self, limit: usize) -> Result<(), ConfigError> {
        if !(1..=MAX_MATCH_COUNT).contains(&limit) {
            return Err(ConfigError::InvalidLimit(limit));
        }
        self.default_limit = limit;
        Ok(())
    }
}

impl TimeoutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("embedding", self.embedding_secs),
            ("vector search", self.vector_secs),
            ("text search", self.text_secs),
        ] {
            if !(1..=120).contains(&secs) {
                return Err(ConfigError::InvalidTimeout(name, secs));
            }
        }
        Ok(())
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("embedding", self.embedding_ttl_secs),
            ("results", self.results_ttl_secs),
            ("expansion", self.expansion_ttl_secs),
            ("sweep interval", self.sweep_interval_secs),
        ] {
            if !(1..=86_400).contains(&secs) {
                return Err(ConfigError::InvalidTtl(name, secs));
            }
        }
        Ok(())
    }
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=86_400).contains(&self.format_ttl_secs) {
            return Err(ConfigError::InvalidTtl("catalog format", self.format_ttl_secs));
        }
        Ok(())
    }
}

fn join_path(base: &str, path: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(base).map_err(|_| ConfigError::InvalidUrl(base.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(base.to_string()));
    }

    // Url::join replaces the last segment unless the base ends with '/'
    if !url.path().ends_with('/') {
        let with_slash = format!("{}/", url.path());
        url.set_path(&with_slash);
    }

    url.join(path)
        .map_err(|_| ConfigError::InvalidUrl(base.to_string()))
}

fn validate_env_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvName(name.to_string()))
    }
}

fn validate_identifier(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(name.to_string()))
    }
}

fn read_secret(env_name: &str) -> Result<String, ConfigError> {
    std::env::var(env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingApiKey(env_name.to_string()))
}
