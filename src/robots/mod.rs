//! Robots.txt handling module
//!
//! The start host's robots.txt is fetched once per crawl. A missing or
//! unreachable file allows everything.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the host of `site`
///
/// Never fails: any error, non-success status or unreadable body is logged
/// and treated as "allow all".
///
/// # Arguments
///
/// * `client` - The crawler's HTTP client
/// * `site` - Any URL on the host whose robots.txt is wanted
pub async fn fetch_robots(client: &Client, site: &Url) -> ParsedRobots {
    let robots_url = match site.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", site, e);
            return ParsedRobots::allow_all();
        }
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}; allowing all", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::info!(
            "No robots.txt at {} (HTTP {}); allowing all",
            robots_url,
            response.status().as_u16()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            tracing::debug!("Loaded robots.txt from {} ({} bytes)", robots_url, body.len());
            ParsedRobots::from_content(&body)
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}; allowing all", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Returns the robots.txt product token for a crawler name
///
/// Only letters, `-` and `_` are kept, since the matcher compares agent names
/// on that alphabet.
pub fn product_token(crawler_name: &str) -> String {
    crawler_name
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == '-' || *c == '_')
        .collect()
}
