//! Charity Crawler: a polite three-tier charity-rating site crawler
//!
//! This crate walks a charity-rating site from its alphabetical index, through
//! the per-letter directory pages, down to each charity's detail page, and turns
//! every detail page into a typed [`CharityRecord`]. Records are handed to a
//! [`RecordSink`](output::RecordSink), by default a CSV dataset.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod record;
pub mod robots;
pub mod schema;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Only systemic failures end up here. Per-URL transport failures and per-page
/// schema mismatches are recorded in the crawl report instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Site schema error: {0}")]
    Schema(#[from] schema::SchemaError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to fetch root index {url}: {source}")]
    IndexFetch {
        url: String,
        source: crawler::FetchError,
    },

    #[error("Root index {url} was not fetched: {reason}")]
    IndexSkipped { url: String, reason: SkipReason },

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Aborting crawl after {count} consecutive transport failures (last: {last_url})")]
    TooManyFailures { count: u32, last_url: String },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
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

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use record::CharityRecord;
pub use schema::{CompiledSchema, SiteSchema};
pub use state::{CrawlPhase, SkipReason};
pub use crate::url::{extract_domain, is_allowed_domain, normalize_url};
