use crate::schema::SiteSchema;
use serde::Deserialize;

/// Main configuration structure for the charity crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    /// Page layout for the site revision being crawled
    #[serde(default)]
    pub schema: SiteSchema,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Root index page listing the per-letter directories
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Domain patterns the crawl may visit (e.g. "charitynavigator.org" or "*.charitynavigator.org")
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "minimum-time-between-requests")]
    pub minimum_time_between_requests: u64,

    /// Maximum number of requests per host
    #[serde(rename = "max-domain-requests")]
    pub max_domain_requests: u32,

    /// Consecutive transport failures tolerated before the crawl is aborted
    #[serde(rename = "max-consecutive-failures", default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether to honour the start host's robots.txt
    #[serde(rename = "respect-robots-txt", default = "default_true")]
    pub respect_robots_txt: bool,

    /// Refuse plain-HTTP URLs
    #[serde(rename = "https-only", default = "default_true")]
    pub https_only: bool,

    /// Stop after this many directory pages (sampling)
    #[serde(rename = "max-directory-pages", default)]
    pub max_directory_pages: Option<usize>,

    /// Stop after this many detail pages (sampling)
    #[serde(rename = "max-detail-pages", default)]
    pub max_detail_pages: Option<usize>,
}

fn default_max_consecutive_failures() -> u32 {
    25
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV dataset to write
    #[serde(rename = "dataset-path")]
    pub dataset_path: String,

    /// Optional path for a markdown crawl report
    #[serde(rename = "report-path", default)]
    pub report_path: Option<String>,
}
