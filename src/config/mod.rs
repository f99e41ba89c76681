//! Configuration module for BBC-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; omitted sections fall back to the stock crawl settings.
//!
//! # Example
//!
//! ```no_run
//! use bbc_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Keywords: {}", config.search.keywords.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DedupConfig, HttpConfig, OutputConfig, PolitenessConfig, QueryEntry,
    SearchConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{parse_date, validate};
