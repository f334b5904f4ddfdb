//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's user agent
//! - GET requests for index, directory and detail pages
//! - Classifying every failure into a [`SkipReason`]

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::state::SkipReason;
use crate::url::is_allowed_url;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Page body content
    pub body: String,
}

/// Why a fetch produced no page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Dead link (HTTP {0})")]
    DeadLink(u16),

    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP error {0}")]
    HttpStatus(u16),

    #[error("Not an HTML page: {0:?}")]
    ContentMismatch(String),

    #[error("Unreachable: {0}")]
    Unreachable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Redirected outside the allowed domains: {0}")]
    OffDomain(String),
}

impl FetchError {
    /// The skip reason recorded for this failure
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            Self::DeadLink(_) => SkipReason::DeadLink,
            Self::RateLimited => SkipReason::RateLimited,
            Self::HttpStatus(_) => SkipReason::HttpError,
            Self::ContentMismatch(_) => SkipReason::ContentMismatch,
            Self::Unreachable(_) => SkipReason::Unreachable,
            Self::Network(_) => SkipReason::NetworkError,
            Self::OffDomain(_) => SkipReason::OffDomain,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Timeout and scheme settings
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use charity_crawler::config::load_config;
/// use charity_crawler::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("charity-crawler.toml")).unwrap();
/// let client = build_http_client(&config.user_agent, &config.crawler).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .https_only(crawler.https_only)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches one HTML page
///
/// # Response Handling
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 404 / 410 | `DeadLink` |
/// | HTTP 429 | `RateLimited` |
/// | Other non-2xx | `HttpStatus` |
/// | Content-Type not HTML | `ContentMismatch` |
/// | Timeout, refused connection, TLS failure | `Unreachable` |
/// | Final URL outside `allowed_domains` | `OffDomain` |
/// | Anything else (body read, redirect loop) | `Network` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `allowed_domains` - Domain patterns the final URL must stay within
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    allowed_domains: &[String],
) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(classify_request_error)?;

    let status = response.status();
    let final_url = response.url().clone();

    if !is_allowed_url(&final_url, allowed_domains) {
        return Err(FetchError::OffDomain(final_url.to_string()));
    }

    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(FetchError::DeadLink(status.as_u16()));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }

    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html(&content_type) {
        return Err(FetchError::ContentMismatch(content_type));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body,
    })
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

fn classify_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Unreachable("Request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Unreachable(format!("Connection failed: {}", e))
    } else {
        FetchError::Network(e.to_string())
    }
}
