use thiserror::Error;

pub type Result<T> = std::result::Result<T, FaqError>;

#[derive(Error, Debug)]
pub enum FaqError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned HTTP {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<ureq::Error> for FaqError {
    #[inline]
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status) => FaqError::Upstream {
                status,
                message: format!("HTTP {}", status),
            },
            ureq::Error::Timeout(timeout) => FaqError::Timeout(timeout.to_string()),
            other => FaqError::Network(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FaqError {
    #[inline]
    fn from(error: serde_json::Error) -> Self {
        FaqError::Parse(error.to_string())
    }
}

pub mod cache;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod mcp;
pub mod search;
pub mod store;
