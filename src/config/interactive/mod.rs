
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{BackendKind, Config, ConfigError, EmbeddingConfig, SupabaseConfig};
use crate::search::ExpansionPolicy;

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Coach FAQ Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embedding API").bold().yellow());
    eprintln!("Queries are embedded with an OpenAI-compatible embeddings endpoint.");
    eprintln!();
    configure_embeddings(&mut config.embeddings)?;

    eprintln!();
    eprintln!("{}", style("Search Backend").bold().yellow());
    configure_backend(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Search Defaults").bold().yellow());
    configure_search(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Checking credentials...").yellow());
    report_credentials(&config);

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    match config.embeddings.endpoint_url() {
        Ok(url) => eprintln!("  Endpoint: {}", style(url).cyan()),
        Err(e) => eprintln!("  Endpoint: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.embeddings.model).cyan());
    eprintln!("  Dimensions: {}", style(config.embeddings.dimensions).cyan());
    eprintln!(
        "  API key variable: {}",
        style(&config.embeddings.api_key_env).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Backend:").bold().yellow());
    eprintln!("  Kind: {}", style(config.backend.kind).cyan());
    match config.backend.kind {
        BackendKind::Supabase => {
            eprintln!("  Supabase URL: {}", style(&config.supabase.url).cyan());
            eprintln!("  RPC function: {}", style(&config.supabase.rpc_function).cyan());
            eprintln!("  FAQ table: {}", style(&config.supabase.faq_table).cyan());
            eprintln!(
                "  API key variable: {}",
                style(&config.supabase.api_key_env).cyan()
            );
        }
        BackendKind::Local => {
            eprintln!(
                "  SQLite database: {}",
                style(config.database_path().display()).cyan()
            );
            eprintln!(
                "  Vector database: {}",
                style(config.vector_database_path().display()).cyan()
            );
        }
    }

    eprintln!();
    eprintln!("{}", style("Search:").bold().yellow());
    eprintln!("  Default limit: {}", style(config.search.default_limit).cyan());
    eprintln!(
        "  Expansion policy: {}",
        style(config.search.expansion_policy).cyan()
    );
    eprintln!(
        "  Distance metric: {}",
        style(config.search.distance_metric).cyan()
    );
    eprintln!(
        "  Cache TTLs: embeddings {}s, results {}s, expansions {}s",
        config.search.cache.embedding_ttl_secs,
        config.search.cache.results_ttl_secs,
        config.search.cache.expansion_ttl_secs
    );

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embeddings(embeddings: &mut EmbeddingConfig) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt("Embedding API base URL")
        .default(embeddings.base_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let mut temp_config = EmbeddingConfig::default();
            temp_config.set_base_url(input.clone())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embeddings.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimensions: u32 = Input::new()
        .with_prompt("Embedding dimensions")
        .default(embeddings.dimensions)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimensions must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the API key")
        .default(embeddings.api_key_env.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let mut temp_config = EmbeddingConfig::default();
            temp_config.set_api_key_env(input.clone())
        })
        .interact_text()?;

    embeddings.set_base_url(base_url)?;
    embeddings.set_model(model)?;
    embeddings.set_dimensions(dimensions)?;
    embeddings.set_api_key_env(api_key_env)?;

    Ok(())
}

fn configure_backend(config: &mut Config) -> Result<()> {
    let kinds = [BackendKind::Supabase, BackendKind::Local];
    let labels = ["supabase (hosted match_documents RPC)", "local (SQLite + LanceDB)"];
    let default_index = kinds
        .iter()
        .position(|kind| *kind == config.backend.kind)
        .unwrap_or(0);

    let index = Select::new()
        .with_prompt("Search backend")
        .default(default_index)
        .items(&labels)
        .interact()?;
    config.backend.kind = kinds[index];

    if config.backend.kind == BackendKind::Supabase {
        configure_supabase(&mut config.supabase)?;
    }

    Ok(())
}

fn configure_supabase(supabase: &mut SupabaseConfig) -> Result<()> {
    let url: String = Input::new()
        .with_prompt("Supabase project URL")
        .default(supabase.url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let mut temp_config = SupabaseConfig::default();
            temp_config.set_url(input.clone())
        })
        .interact_text()?;

    let faq_table: String = Input::new()
        .with_prompt("FAQ table name")
        .default(supabase.faq_table.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let mut temp_config = SupabaseConfig::default();
            temp_config.set_faq_table(input.clone())
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("Environment variable holding the Supabase key")
        .default(supabase.api_key_env.clone())
        .interact_text()?;

    supabase.set_url(url)?;
    supabase.set_faq_table(faq_table)?;
    supabase.api_key_env = api_key_env;
    supabase.validate()?;

    Ok(())
}

fn configure_search(config: &mut Config) -> Result<()> {
    let limit: usize = Input::new()
        .with_prompt("Default number of FAQ results")
        .default(config.search.default_limit)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Limit must be between 1 and 50")
            }
        })
        .interact_text()?;

    let policies = [
        ExpansionPolicy::Conditional,
        ExpansionPolicy::Never,
        ExpansionPolicy::Always,
    ];
    let default_index = policies
        .iter()
        .position(|policy| *policy == config.search.expansion_policy)
        .unwrap_or(0);
    let policy_index = Select::new()
        .with_prompt("Query expansion policy")
        .default(default_index)
        .items(&policies)
        .interact()?;

    config.search.set_default_limit(limit)?;
    config.search.expansion_policy = policies[policy_index];

    Ok(())
}

fn report_credentials(config: &Config) {
    match config.embeddings.api_key() {
        Ok(_) => eprintln!(
            "{}",
            style(format!("✓ {} is set", config.embeddings.api_key_env)).green()
        ),
        Err(e) => eprintln!("{}", style(format!("⚠ {}", e)).yellow()),
    }

    if config.backend.kind == BackendKind::Supabase {
        match config.supabase.api_key() {
            Ok(_) => eprintln!(
                "{}",
                style(format!("✓ {} is set", config.supabase.api_key_env)).green()
            ),
            Err(e) => eprintln!("{}", style(format!("⚠ {}", e)).yellow()),
        }
    }
}
