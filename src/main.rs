use anyhow::Result;
use clap::{Parser, Subcommand};
use coach_faq::catalog::Verbosity;
use coach_faq::commands::{
    import_faqs, search_faqs, serve_mcp, show_intent, show_products, show_status,
};
use coach_faq::config::{Config, get_config_dir, run_interactive_config, show_config};
use coach_faq::search::ExpansionPolicy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "coach-faq")]
#[command(about = "FAQ retrieval and product context for an AI coaching assistant")]
#[command(version)]
struct Cli {
    /// Base directory for configuration and local stores (default: ~/.coach-faq)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding API, backend and search settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed a JSON file of FAQ entries into the local backend
    Import {
        /// JSON array of {question, answer, source?, upsert_key?}
        file: PathBuf,
    },
    /// Search the FAQ knowledge base
    Search {
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Query expansion policy
        #[arg(long, value_enum)]
        policy: Option<ExpansionPolicy>,
        /// Print the raw search outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify a message and show the suggested platform route
    Intent { query: String },
    /// Format catalog products as prompt text
    Products {
        /// Product ids; all products when omitted
        ids: Vec<String>,
        #[arg(long, value_enum, default_value_t = Verbosity::Standard)]
        verbosity: Verbosity,
    },
    /// Start MCP server on stdio
    Serve,
    /// Show configuration, backend and catalog status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout is reserved for command output and the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Import { file } => {
            import_faqs(&Config::load(&config_dir)?, &file).await?;
        }
        Commands::Search {
            query,
            limit,
            policy,
            json,
        } => {
            search_faqs(&Config::load(&config_dir)?, &query, limit, policy, json).await?;
        }
        Commands::Intent { query } => {
            show_intent(&Config::load(&config_dir)?, &query)?;
        }
        Commands::Products { ids, verbosity } => {
            show_products(&Config::load(&config_dir)?, &ids, verbosity)?;
        }
        Commands::Serve => {
            serve_mcp(&Config::load(&config_dir)?).await?;
        }
        Commands::Status => {
            show_status(&Config::load(&config_dir)?).await?;
        }
    }

    Ok(())
}
