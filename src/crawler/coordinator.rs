//! Crawler coordinator - main crawl orchestration logic
//!
//! The crawl walks three tiers in order: the root index, every directory page
//! it links to, then every detail page those link to. Each tier runs with
//! bounded concurrency and the next one starts only after the previous tier
//! has fully resolved.
//!
//! Pages are parsed synchronously as soon as their body arrives; no parsed
//! document is held across an `.await`.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchError, FetchedPage};
use crate::crawler::scheduler::Scheduler;
use crate::extract::{discover_links, parse_detail_page};
use crate::output::{CrawlReport, RecordSink};
use crate::robots::{fetch_robots, product_token, ParsedRobots};
use crate::schema::{CompiledLinkRule, CompiledSchema};
use crate::state::{CrawlPhase, SkipReason, Tier};
use crate::url::{is_allowed_url, parse_and_normalize};
use crate::CrawlError;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Detail pages between two progress log lines
const PROGRESS_INTERVAL: u64 = 25;

/// What happened to one scheduled URL
#[derive(Debug)]
enum FetchOutcome {
    /// The page arrived
    Fetched(FetchedPage),
    /// A request was sent but produced no page
    Failed(FetchError),
    /// No request was sent
    NotStarted(SkipReason),
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    client: Client,
    schema: CompiledSchema,
    scheduler: Scheduler,
    start_url: Url,
    robots: ParsedRobots,
    robots_agent: String,
    phase: CrawlPhase,
    token: CancellationToken,
    config_hash: String,
    consecutive_failures: u32,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Builds the HTTP client, compiles the site schema and sets up the
    /// scheduler. A schema that does not compile fails here, before any
    /// request is made.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - Bad start URL, bad schema or client build failure
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let start_url = parse_and_normalize(&config.crawler.start_url)?;
        let schema = config.schema.compile()?;
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let scheduler = Scheduler::new(&config.crawler);
        let robots_agent = product_token(&config.user_agent.crawler_name);

        Ok(Self {
            config,
            client,
            schema,
            scheduler,
            start_url,
            robots: ParsedRobots::allow_all(),
            robots_agent,
            phase: CrawlPhase::Idle,
            token: CancellationToken::new(),
            config_hash: String::new(),
            consecutive_failures: 0,
        })
    }

    /// Sets the config file hash recorded in the report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Token that stops the crawl when cancelled
    ///
    /// URLs not yet requested are recorded as `Cancelled`; in-flight requests
    /// finish and their pages are still processed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Moves to the next crawl phase
    ///
    /// # Returns
    ///
    /// * `Err(CrawlError::InvalidTransition)` - `to` is not the next phase
    pub fn transition_to(&mut self, to: CrawlPhase) -> Result<(), CrawlError> {
        if !self.phase.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::info!("Crawl phase: {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Runs the crawl to completion
    ///
    /// Every record is handed to `sink`; `sink.finish()` is called once at
    /// the end, including after cancellation.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl finished or was cancelled
    /// * `Err(CrawlError)` - The index could not be fetched, too many
    ///   consecutive transport failures occurred, or the sink failed
    pub async fn run(&mut self, sink: &mut dyn RecordSink) -> Result<CrawlReport, CrawlError> {
        let mut report = CrawlReport::new(self.config_hash.clone(), self.schema.version.clone());
        self.consecutive_failures = 0;

        tracing::info!(
            "Starting crawl at {} (schema {})",
            self.start_url,
            self.schema.version
        );

        if self.config.crawler.respect_robots_txt {
            self.load_robots().await;
        }

        // ===== Index =====
        self.transition_to(CrawlPhase::FetchingIndex)?;
        let directory_urls = self.crawl_index(&mut report).await?;

        // ===== Directories =====
        self.transition_to(CrawlPhase::FetchingDirectories)?;
        let detail_urls = self.crawl_directories(directory_urls, &mut report).await?;

        // ===== Details =====
        self.transition_to(CrawlPhase::FetchingDetails)?;
        self.crawl_details(detail_urls, sink, &mut report).await?;

        sink.finish()?;
        self.transition_to(CrawlPhase::Done)?;

        report.cancelled = self.token.is_cancelled();
        report.finish();

        tracing::info!(
            "Crawl finished: {} records ({} identity only), {} URLs skipped, {} links filtered, {} requests sent",
            report.records_emitted,
            report.identity_only,
            report.pages_skipped(),
            report.links_filtered(),
            self.scheduler.total_requests()
        );

        Ok(report)
    }

    /// Loads robots.txt for the start host and applies its crawl delay
    async fn load_robots(&mut self) {
        self.robots = fetch_robots(&self.client, &self.start_url).await;
        if let Some(delay) = self.robots.crawl_delay(&self.robots_agent) {
            self.scheduler.apply_crawl_delay(delay);
        }
    }

    /// Fetches the root index and returns the directory URLs it links to
    async fn crawl_index(&self, report: &mut CrawlReport) -> Result<Vec<Url>, CrawlError> {
        let start_url = self.start_url.clone();

        if !self.robots.is_allowed(&start_url, &self.robots_agent) {
            return Err(CrawlError::IndexSkipped {
                url: start_url.to_string(),
                reason: SkipReason::RobotsDenied,
            });
        }

        let page = match self.fetch_one(&start_url).await {
            FetchOutcome::Fetched(page) => page,
            FetchOutcome::Failed(source) => {
                return Err(CrawlError::IndexFetch {
                    url: start_url.to_string(),
                    source,
                })
            }
            FetchOutcome::NotStarted(SkipReason::Cancelled) => {
                tracing::warn!("Crawl cancelled before the index was fetched");
                report.record_skip(
                    start_url.as_str(),
                    Tier::Index,
                    SkipReason::Cancelled,
                    "cancelled",
                );
                return Ok(Vec::new());
            }
            FetchOutcome::NotStarted(reason) => {
                return Err(CrawlError::IndexSkipped {
                    url: start_url.to_string(),
                    reason,
                })
            }
        };
        report.record_attempt(Tier::Index);
        report.record_success(Tier::Index);

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        self.collect_links(
            &page,
            &self.schema.index_links,
            Tier::Directory,
            &mut seen,
            &mut urls,
            report,
        );
        apply_cap(&mut urls, self.config.crawler.max_directory_pages, Tier::Directory);

        tracing::info!("Index lists {} directory pages", urls.len());
        Ok(urls)
    }

    /// Fetches every directory page and returns the deduplicated detail URLs
    async fn crawl_directories(
        &mut self,
        urls: Vec<Url>,
        report: &mut CrawlReport,
    ) -> Result<Vec<Url>, CrawlError> {
        let this = &*self;
        let mut consecutive_failures = this.consecutive_failures;
        let mut seen = HashSet::new();
        let mut detail_urls = Vec::new();

        let mut results = stream::iter(urls)
            .map(move |url| async move {
                let outcome = this.fetch_one(&url).await;
                (url, outcome)
            })
            .buffer_unordered(this.concurrency());

        while let Some((url, outcome)) = results.next().await {
            match outcome {
                FetchOutcome::Fetched(page) => {
                    consecutive_failures = 0;
                    report.record_attempt(Tier::Directory);
                    report.record_success(Tier::Directory);
                    let before = detail_urls.len();
                    this.collect_links(
                        &page,
                        &this.schema.directory_links,
                        Tier::Detail,
                        &mut seen,
                        &mut detail_urls,
                        report,
                    );
                    tracing::debug!(
                        "Directory {} lists {} new detail pages",
                        url,
                        detail_urls.len() - before
                    );
                }
                FetchOutcome::Failed(e) => {
                    report.record_attempt(Tier::Directory);
                    this.record_failure(&url, Tier::Directory, &e, report);
                    consecutive_failures = this.escalate(consecutive_failures, &e, &url)?;
                }
                FetchOutcome::NotStarted(reason) => {
                    record_not_started(&url, Tier::Directory, reason, report);
                }
            }
        }
        drop(results);
        self.consecutive_failures = consecutive_failures;

        apply_cap(&mut detail_urls, self.config.crawler.max_detail_pages, Tier::Detail);
        tracing::info!("Directories list {} detail pages", detail_urls.len());
        Ok(detail_urls)
    }

    /// Fetches and parses every detail page, handing records to the sink
    async fn crawl_details(
        &mut self,
        urls: Vec<Url>,
        sink: &mut dyn RecordSink,
        report: &mut CrawlReport,
    ) -> Result<(), CrawlError> {
        let this = &*self;
        let mut consecutive_failures = this.consecutive_failures;
        let total = urls.len();
        let mut resolved: u64 = 0;

        let mut results = stream::iter(urls)
            .map(move |url| async move {
                let outcome = this.fetch_one(&url).await;
                (url, outcome)
            })
            .buffer_unordered(this.concurrency());

        while let Some((url, outcome)) = results.next().await {
            resolved += 1;
            match outcome {
                FetchOutcome::Fetched(page) => {
                    consecutive_failures = 0;
                    report.record_attempt(Tier::Detail);
                    match parse_detail_page(&page.body, &this.schema) {
                        Ok(record) => {
                            report.record_success(Tier::Detail);
                            report.record_emitted(record.is_rated());
                            sink.accept(record)?;
                        }
                        Err(e) => {
                            tracing::warn!("Skipping {}: {}", url, e);
                            report.record_skip(
                                url.as_str(),
                                Tier::Detail,
                                SkipReason::SchemaMismatch,
                                e.to_string(),
                            );
                        }
                    }
                }
                FetchOutcome::Failed(e) => {
                    report.record_attempt(Tier::Detail);
                    this.record_failure(&url, Tier::Detail, &e, report);
                    consecutive_failures = this.escalate(consecutive_failures, &e, &url)?;
                }
                FetchOutcome::NotStarted(reason) => {
                    record_not_started(&url, Tier::Detail, reason, report);
                }
            }

            if resolved % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {}/{} detail pages, {} records",
                    resolved,
                    total,
                    report.records_emitted
                );
            }
        }
        drop(results);
        self.consecutive_failures = consecutive_failures;

        Ok(())
    }

    /// Runs the politeness checks and fetches one URL
    async fn fetch_one(&self, url: &Url) -> FetchOutcome {
        if self.token.is_cancelled() {
            return FetchOutcome::NotStarted(SkipReason::Cancelled);
        }

        let slot = tokio::select! {
            _ = self.token.cancelled() => return FetchOutcome::NotStarted(SkipReason::Cancelled),
            slot = self.scheduler.acquire(url) => match slot {
                Ok(slot) => slot,
                Err(reason) => return FetchOutcome::NotStarted(reason),
            },
        };

        tokio::select! {
            _ = self.token.cancelled() => return FetchOutcome::NotStarted(SkipReason::Cancelled),
            _ = slot.wait() => {}
        }

        tracing::debug!("Fetching {}", url);
        let result = fetch_page(&self.client, url, &self.config.crawler.allowed_domains).await;
        drop(slot);

        match result {
            Ok(page) => FetchOutcome::Fetched(page),
            Err(e) => FetchOutcome::Failed(e),
        }
    }

    /// Adds the next-tier links of `page` to `urls`
    ///
    /// Links already in `seen` are ignored. New links outside the allowed
    /// domains or denied by robots.txt are recorded as filtered.
    fn collect_links(
        &self,
        page: &FetchedPage,
        rule: &CompiledLinkRule,
        tier: Tier,
        seen: &mut HashSet<String>,
        urls: &mut Vec<Url>,
        report: &mut CrawlReport,
    ) {
        for link in discover_links(&page.body, &page.final_url, rule) {
            if !seen.insert(link.as_str().to_string()) {
                continue;
            }

            if !is_allowed_url(&link, &self.config.crawler.allowed_domains) {
                tracing::debug!("Skipping off-domain link {}", link);
                report.record_filtered(link.as_str(), tier, SkipReason::OffDomain);
                continue;
            }

            if !self.robots.is_allowed(&link, &self.robots_agent) {
                tracing::debug!("robots.txt disallows {}", link);
                report.record_filtered(link.as_str(), tier, SkipReason::RobotsDenied);
                continue;
            }

            urls.push(link);
        }
    }

    fn record_failure(&self, url: &Url, tier: Tier, error: &FetchError, report: &mut CrawlReport) {
        tracing::warn!("Failed to fetch {} page {}: {}", tier, url, error);
        report.record_skip(url.as_str(), tier, error.skip_reason(), error.to_string());
    }

    /// Updates the consecutive transport failure count
    ///
    /// # Returns
    ///
    /// * `Err(CrawlError::TooManyFailures)` - The configured limit was reached
    fn escalate(&self, count: u32, error: &FetchError, url: &Url) -> Result<u32, CrawlError> {
        if !error.skip_reason().is_transport() {
            return Ok(count);
        }

        let count = count + 1;
        if count >= self.config.crawler.max_consecutive_failures {
            tracing::error!(
                "{} consecutive transport failures; aborting crawl",
                count
            );
            return Err(CrawlError::TooManyFailures {
                count,
                last_url: url.to_string(),
            });
        }
        Ok(count)
    }

    fn concurrency(&self) -> usize {
        self.config.crawler.max_concurrent_fetches.max(1) as usize
    }
}

fn record_not_started(url: &Url, tier: Tier, reason: SkipReason, report: &mut CrawlReport) {
    if reason == SkipReason::Cancelled {
        tracing::debug!("Cancelled before fetching {}", url);
    } else {
        tracing::warn!("Not fetching {} page {}: {}", tier, url, reason);
    }
    report.record_skip(url.as_str(), tier, reason, "");
}

/// Truncates a tier to its sampling limit
fn apply_cap(urls: &mut Vec<Url>, cap: Option<usize>, tier: Tier) {
    if let Some(cap) = cap {
        if urls.len() > cap {
            tracing::info!(
                "Sampling {} of {} {} pages",
                cap,
                urls.len(),
                tier
            );
            urls.truncate(cap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config(extra: &str) -> Config {
        toml::from_str(&format!(
            r#"
            [crawler]
            start-url = "https://www.charitynavigator.org/index.cfm?bay=search.alpha"
            allowed-domains = ["www.charitynavigator.org"]
            max-concurrent-fetches = 2
            minimum-time-between-requests = 100
            max-domain-requests = 100
            {}

            [user-agent]
            crawler-name = "TestCrawler"
            crawler-version = "1.0"
            contact-url = "https://example.com/about"
            contact-email = "admin@example.com"

            [output]
            dataset-path = "charities.csv"
            "#,
            extra
        ))
        .unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_phase_transitions() {
        let mut coordinator = Coordinator::new(create_test_config("")).unwrap();
        assert_eq!(coordinator.phase, CrawlPhase::Idle);

        assert!(coordinator.transition_to(CrawlPhase::FetchingDirectories).is_err());
        coordinator.transition_to(CrawlPhase::FetchingIndex).unwrap();
        coordinator.transition_to(CrawlPhase::FetchingDirectories).unwrap();
        assert!(matches!(
            coordinator.transition_to(CrawlPhase::FetchingIndex),
            Err(CrawlError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_invalid_schema_fails_before_crawl() {
        let mut config = create_test_config("");
        config.schema.name.selector = "h1[[".to_string();
        assert!(matches!(
            Coordinator::new(config),
            Err(CrawlError::Schema(_))
        ));
    }

    #[test]
    fn test_collect_links_filters_and_dedupes() {
        let mut coordinator = Coordinator::new(create_test_config("")).unwrap();
        coordinator.robots = ParsedRobots::from_content("User-agent: *\nDisallow: /private");

        let page = FetchedPage {
            final_url: url("https://www.charitynavigator.org/index.cfm?bay=search.alpha&ltr=A"),
            status_code: 200,
            body: r#"
                <div class="mobile-padding charities">
                  <a href="/ein/1">One</a>
                  <a href="/ein/1">One again</a>
                  <a href="https://elsewhere.org/ein/2">Off site</a>
                  <a href="/private/3">Hidden</a>
                  <a href="/ein/4">Four</a>
                </div>
            "#
            .to_string(),
        };

        let mut report = CrawlReport::new("", "");
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        coordinator.collect_links(
            &page,
            &coordinator.schema.directory_links,
            Tier::Detail,
            &mut seen,
            &mut urls,
            &mut report,
        );

        let found: Vec<&str> = urls.iter().map(|u| u.as_str()).collect();
        assert_eq!(
            found,
            vec![
                "https://www.charitynavigator.org/ein/1",
                "https://www.charitynavigator.org/ein/4",
            ]
        );
        assert_eq!(report.skipped_count(SkipReason::OffDomain), 1);
        assert_eq!(report.skipped_count(SkipReason::RobotsDenied), 1);
        assert_eq!(report.details.skipped, 0);
        assert_eq!(report.details.filtered, 2);
    }

    #[test]
    fn test_escalation_counts_transport_failures_only() {
        let coordinator =
            Coordinator::new(create_test_config("max-consecutive-failures = 2")).unwrap();
        let target = url("https://www.charitynavigator.org/ein/1");

        let count = coordinator
            .escalate(0, &FetchError::HttpStatus(500), &target)
            .unwrap();
        assert_eq!(count, 1);

        let count = coordinator
            .escalate(count, &FetchError::OffDomain("x".into()), &target)
            .unwrap();
        assert_eq!(count, 1);

        assert!(matches!(
            coordinator.escalate(count, &FetchError::RateLimited, &target),
            Err(CrawlError::TooManyFailures { count: 2, .. })
        ));
    }

    #[test]
    fn test_apply_cap() {
        let mut urls = vec![
            url("https://a.org/1"),
            url("https://a.org/2"),
            url("https://a.org/3"),
        ];
        apply_cap(&mut urls, None, Tier::Detail);
        assert_eq!(urls.len(), 3);
        apply_cap(&mut urls, Some(2), Tier::Detail);
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1].as_str(), "https://a.org/2");
    }

    #[tokio::test]
    async fn test_cancelled_fetch_is_not_started() {
        let coordinator = Coordinator::new(create_test_config("")).unwrap();
        coordinator.cancellation_token().cancel();

        let outcome = coordinator
            .fetch_one(&url("https://www.charitynavigator.org/ein/1"))
            .await;
        assert!(matches!(
            outcome,
            FetchOutcome::NotStarted(SkipReason::Cancelled)
        ));
    }
}
