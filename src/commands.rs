use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{ProductCatalog, Verbosity, classify_intent, route_platform};
use crate::config::{BackendKind, Config};
use crate::embeddings::OpenAiEmbeddingClient;
use crate::mcp::{McpServer, SERVER_INSTRUCTIONS, SERVER_NAME, register_tools};
use crate::search::{ExpansionPolicy, FaqSearcher};
use crate::store::import::{import_documents, load_entries};
use crate::store::lancedb::LanceVectorIndex;
use crate::store::sqlite::Database;

fn load_catalog(config: &Config) -> Result<ProductCatalog> {
    ProductCatalog::from_config(&config.catalog).context("Failed to load product catalog")
}

/// Embed a JSON file of FAQ entries into the local stores
#[inline]
pub async fn import_faqs(config: &Config, file: &Path) -> Result<()> {
    if config.backend.kind != BackendKind::Local {
        bail!(
            "Import writes to the local backend, but backend.kind is '{}'. \
             Use 'coach-faq config' to switch to the local backend.",
            config.backend.kind
        );
    }

    let documents = load_entries(file)
        .with_context(|| format!("Failed to read FAQ entries from {}", file.display()))?;
    if documents.is_empty() {
        println!("No FAQ entries found in {}", file.display());
        return Ok(());
    }
    info!("Importing {} FAQ entries from {}", documents.len(), file.display());

    let embedder =
        OpenAiEmbeddingClient::new(config).context("Failed to create embedding client")?;
    let database = Database::initialize_from_config(config)
        .await
        .context("Failed to initialize SQLite database")?;
    let index = LanceVectorIndex::open(config)
        .await
        .context("Failed to open vector index")?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(documents.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let summary = import_documents(&documents, &embedder, &database, &index, &bar)
        .await
        .context("Import failed")?;

    println!(
        "{} Imported {} FAQs",
        style("✓").green(),
        summary.imported
    );
    if summary.failed > 0 {
        println!(
            "{} {} entries could not be embedded (see logs)",
            style("!").yellow(),
            summary.failed
        );
    }

    Ok(())
}

/// Run one search and print the results
#[inline]
pub async fn search_faqs(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    policy: Option<ExpansionPolicy>,
    json: bool,
) -> Result<()> {
    let searcher = FaqSearcher::from_config(config)
        .await
        .context("Failed to initialize search backends")?;
    let limit = limit.unwrap_or(config.search.default_limit);
    let policy = policy.unwrap_or(config.search.expansion_policy);

    let outcome = searcher.search_with_outcome(query, limit, policy).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if outcome.results.is_empty() {
        println!("No matching FAQs found.");
        return Ok(());
    }

    println!(
        "{} ({} results via {:?}{})",
        style(query).bold(),
        outcome.results.len(),
        outcome.path,
        if outcome.reranked { ", reranked" } else { "" }
    );
    println!();
    for (index, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. {} {}",
            index + 1,
            style(&result.custom_metadata.question).cyan(),
            style(format!("({:.2})", result.similarity)).dim()
        );
        println!("   {}", result.custom_metadata.answer);
        println!(
            "   {}",
            style(format!(
                "Source: {} [{}]",
                result.source_doc_name, result.upsert_key
            ))
            .dim()
        );
    }

    Ok(())
}

/// Print the intent classification and platform route for a message
#[inline]
pub fn show_intent(config: &Config, query: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let intent = classify_intent(query);
    let route = route_platform(&intent, &catalog);

    println!(
        "Intent: {} (confidence {:.2})",
        style(intent.kind).bold(),
        intent.confidence
    );
    if let Some(category) = intent.category {
        println!("Category: {}", category);
    }
    if let Some(platform) = intent.platform {
        println!("Platform mentioned: {}", platform);
    }
    if !intent.matched_keywords.is_empty() {
        println!("Matched keywords: {}", intent.matched_keywords.join(", "));
    }

    println!("Route: {}", style(route.platform).bold());
    if route.product_ids.is_empty() {
        println!("No products suggested.");
    } else {
        println!("{}", catalog.format_for_ai(&route.product_ids, Verbosity::Minimal));
    }

    Ok(())
}

/// Print products as prompt text; every product when no ids are given
#[inline]
pub fn show_products(config: &Config, ids: &[String], verbosity: Verbosity) -> Result<()> {
    let catalog = load_catalog(config)?;

    let ids: Vec<&str> = if ids.is_empty() {
        catalog.products().iter().map(|p| p.id.as_str()).collect()
    } else {
        for id in ids {
            if catalog.get(id).is_none() {
                warn!("Unknown product id: {}", id);
            }
        }
        ids.iter().map(String::as_str).collect()
    };

    let text = catalog.format_for_ai(&ids, verbosity);
    if text.is_empty() {
        println!("No matching products.");
    } else {
        println!("{}", text);
    }

    Ok(())
}

/// Start the MCP server on stdio until EOF or Ctrl+C
///
/// Stdout carries the protocol, so everything human-readable goes to stderr.
#[inline]
pub async fn serve_mcp(config: &Config) -> Result<()> {
    let searcher = FaqSearcher::from_config(config)
        .await
        .context("Failed to initialize search backends")?;
    let catalog = Arc::new(load_catalog(config)?);
    let sweeper = searcher.caches().spawn_sweeper();

    let server =
        McpServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION")).with_instructions(SERVER_INSTRUCTIONS);
    register_tools(&server, searcher, catalog).await;

    eprintln!(
        "{} MCP server ready on stdio ({} backend). Press Ctrl+C to stop.",
        style("✓").green(),
        config.backend.kind
    );

    let result = tokio::select! {
        result = server.serve_stdio() => result.context("MCP server failed"),
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt signal, shutting down");
            Ok(())
        }
    };

    sweeper.abort();
    result
}

/// Print configuration, backend and catalog status
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    println!("{}", style("coach-faq status").bold());
    println!("{}", "=".repeat(40));

    let config_path = config.config_file_path();
    if config_path.exists() {
        println!("Config: {}", config_path.display());
    } else {
        println!("Config: {} (defaults, not saved)", config_path.display());
    }
    println!();

    println!("{}", style("Embeddings").bold());
    println!(
        "   Model: {} ({} dimensions)",
        config.embeddings.model, config.embeddings.dimensions
    );
    println!("   Endpoint: {}", config.embeddings.base_url);
    print_secret_status(&config.embeddings.api_key_env, config.embeddings.api_key());
    println!();

    println!("{}", style("Backend").bold());
    println!("   Kind: {}", config.backend.kind);
    match config.backend.kind {
        BackendKind::Supabase => {
            println!("   URL: {}", config.supabase.url);
            println!("   RPC: {}", config.supabase.rpc_function);
            println!("   FAQ table: {}", config.supabase.faq_table);
            print_secret_status(&config.supabase.api_key_env, config.supabase.api_key());
        }
        BackendKind::Local => print_local_store_status(config).await,
    }
    println!();

    let search = &config.search;
    println!("{}", style("Search").bold());
    println!(
        "   Default limit: {}, expansion: {}, distance: {}",
        search.default_limit, search.expansion_policy, search.distance_metric
    );
    println!(
        "   Timeouts: embedding {}s, vector {}s, text {}s",
        search.timeouts.embedding_secs, search.timeouts.vector_secs, search.timeouts.text_secs
    );
    println!(
        "   Cache TTLs: embeddings {}s, results {}s, expansions {}s (sweep every {}s)",
        search.cache.embedding_ttl_secs,
        search.cache.results_ttl_secs,
        search.cache.expansion_ttl_secs,
        search.cache.sweep_interval_secs
    );
    println!();

    println!("{}", style("Catalog").bold());
    match load_catalog(config) {
        Ok(catalog) => {
            let source = config
                .catalog
                .path
                .as_ref()
                .map_or_else(|| "built-in".to_string(), |path| path.display().to_string());
            println!("   {} products ({})", catalog.len(), source);
        }
        Err(e) => println!("   {} {:#}", style("✗").red(), e),
    }

    Ok(())
}

fn print_secret_status<E: std::fmt::Display>(env_name: &str, secret: Result<String, E>) {
    match secret {
        Ok(_) => println!("   {} API key found in ${}", style("✓").green(), env_name),
        Err(e) => println!("   {} {}", style("✗").red(), e),
    }
}

async fn print_local_store_status(config: &Config) {
    let database_path = config.database_path();
    if database_path.exists() {
        match Database::new(&database_path).await {
            Ok(database) => match database.count_faqs().await {
                Ok(count) => println!("   SQLite: {} FAQs ({})", count, database_path.display()),
                Err(e) => println!("   SQLite: {} {:#}", style("✗").red(), e),
            },
            Err(e) => println!("   SQLite: {} {:#}", style("✗").red(), e),
        }
    } else {
        println!("   SQLite: not created yet (run 'coach-faq import')");
    }

    if config.vector_database_path().exists() {
        match LanceVectorIndex::open(config).await {
            Ok(index) => match index.count().await {
                Ok(count) => println!("   LanceDB: {} vectors", count),
                Err(e) => println!("   LanceDB: {} {}", style("✗").red(), e),
            },
            Err(e) => println!("   LanceDB: {} {}", style("✗").red(), e),
        }
    } else {
        println!("   LanceDB: not created yet");
    }
}
