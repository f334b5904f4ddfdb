//! Crawler module for the three-tier crawl
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and failure classification
//! - Politeness scheduling (concurrency, per-host spacing, request budgets)
//! - Overall crawl coordination across the index, directory and detail tiers

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage};
pub use scheduler::{FetchSlot, Scheduler};

use crate::config::Config;
use crate::output::{CrawlReport, RecordSink};
use crate::CrawlError;

/// Runs a complete crawl
///
/// This is the main entry point for library users. It will:
/// 1. Compile the site schema and build the HTTP client
/// 2. Load robots.txt for the start host
/// 3. Fetch the index, then every directory, then every detail page
/// 4. Hand each record to `sink` and return the crawl report
///
/// # Example
///
/// ```no_run
/// use charity_crawler::config::load_config;
/// use charity_crawler::crawler::crawl;
/// use charity_crawler::output::MemorySink;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("charity-crawler.toml"))?;
/// let mut sink = MemorySink::new();
/// let report = crawl(config, &mut sink).await?;
/// println!("{} records", report.records_emitted);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config, sink: &mut dyn RecordSink) -> Result<CrawlReport, CrawlError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run(sink).await
}
