// Configuration management module
// TOML settings under the base directory, plus the interactive editor

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    BackendConfig, BackendKind, CacheConfig, CatalogConfig, Config, ConfigError,
    EmbeddingConfig, SearchConfig, SupabaseConfig, TimeoutConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
