//! BBC-Harvest: a polite keyword crawler for news articles
//!
//! This crate searches a news site for topical keywords, extracts article text and
//! embedded media through cascading selector strategies, and persists everything as
//! plain-text article files plus JSON reports for downstream analysis.

pub mod config;
pub mod crawler;
pub mod models;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for BBC-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Writer error: {0}")]
    Writer(#[from] output::WriterError),

    #[error("Input format error: {0}")]
    Format(#[from] FormatError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid date in config: {0}")]
    InvalidDate(String),
}

/// Errors surfaced by the HTTP transport once its retry budget is spent
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl TransportError {
    /// Returns the URL the error refers to, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Status { url, .. }
            | Self::RetriesExhausted { url, .. }
            | Self::Network { url, .. }
            | Self::Body { url, .. } => Some(url),
            Self::Client(_) => None,
        }
    }
}

/// Errors raised while loading a search-results file
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Search results file not found: {0}")]
    NotFound(String),

    #[error("No search results file given and none of the defaults exist ({0})")]
    NoDefault(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Reasons an article page yields no article
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("page unreachable: {0}")]
    Unreachable(#[from] TransportError),

    #[error("no article body found")]
    NoBody,

    #[error("no article paragraphs found")]
    NoParagraphs,
}

/// Reasons a media asset could not be stored
#[derive(Debug, Error)]
pub enum MediaFailure {
    #[error("invalid media URL: {0}")]
    InvalidUrl(String),

    #[error("fetch failed: {0}")]
    Transport(#[from] TransportError),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("dedup store failed: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Result type alias for BBC-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use models::{Article, ArticleSummary, DownloadReport, MediaKind, MediaRef, SearchHit};
pub use state::{CandidateState, KeywordState};
