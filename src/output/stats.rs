//! Crawl report and its plain-text rendering
//!
//! The coordinator fills a [`CrawlReport`] while it runs; the binary prints it
//! and optionally renders it as markdown.

use crate::state::{SkipReason, Tier};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Counters for one link tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    /// URLs for which a fetch was started
    pub attempted: u64,
    /// Pages fetched (and for details, parsed) successfully
    pub succeeded: u64,
    /// Queued URLs resolved without a result, whether fetched or not
    pub skipped: u64,
    /// Discovered links never queued (off-domain or denied by robots.txt)
    pub filtered: u64,
}

/// A URL that produced no output
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedUrl {
    pub url: String,
    pub tier: Tier,
    pub reason: SkipReason,
    pub message: String,
}

/// Everything a crawl did, for the end-of-run summary
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,
    pub schema_version: String,

    pub index: TierStats,
    pub directories: TierStats,
    pub details: TierStats,

    /// Records handed to the sink
    pub records_emitted: u64,
    /// Emitted records without a rating block
    pub identity_only: u64,

    pub skipped_by_reason: BTreeMap<SkipReason, u64>,
    pub skipped: Vec<SkippedUrl>,

    /// True when the crawl stopped on the cancellation token
    pub cancelled: bool,
}

impl CrawlReport {
    /// Starts a report stamped with the current time
    pub fn new(config_hash: impl Into<String>, schema_version: impl Into<String>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            config_hash: config_hash.into(),
            schema_version: schema_version.into(),
            index: TierStats::default(),
            directories: TierStats::default(),
            details: TierStats::default(),
            records_emitted: 0,
            identity_only: 0,
            skipped_by_reason: BTreeMap::new(),
            skipped: Vec::new(),
            cancelled: false,
        }
    }

    pub fn tier(&self, tier: Tier) -> &TierStats {
        match tier {
            Tier::Index => &self.index,
            Tier::Directory => &self.directories,
            Tier::Detail => &self.details,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut TierStats {
        match tier {
            Tier::Index => &mut self.index,
            Tier::Directory => &mut self.directories,
            Tier::Detail => &mut self.details,
        }
    }

    /// Records a fetch being started
    pub fn record_attempt(&mut self, tier: Tier) {
        self.tier_mut(tier).attempted += 1;
    }

    /// Records a successful page
    pub fn record_success(&mut self, tier: Tier) {
        self.tier_mut(tier).succeeded += 1;
    }

    /// Records a URL that produced no output
    pub fn record_skip(
        &mut self,
        url: impl Into<String>,
        tier: Tier,
        reason: SkipReason,
        message: impl Into<String>,
    ) {
        self.tier_mut(tier).skipped += 1;
        *self.skipped_by_reason.entry(reason).or_insert(0) += 1;
        self.skipped.push(SkippedUrl {
            url: url.into(),
            tier,
            reason,
            message: message.into(),
        });
    }

    /// Records a discovered link that was dropped before queueing
    ///
    /// Counted by reason and listed like a skip, but kept out of the tier's
    /// `skipped` so that `attempted` and `skipped` only cover queued URLs.
    pub fn record_filtered(&mut self, url: impl Into<String>, tier: Tier, reason: SkipReason) {
        self.tier_mut(tier).filtered += 1;
        *self.skipped_by_reason.entry(reason).or_insert(0) += 1;
        self.skipped.push(SkippedUrl {
            url: url.into(),
            tier,
            reason,
            message: String::new(),
        });
    }

    /// Records a record handed to the sink
    pub fn record_emitted(&mut self, rated: bool) {
        self.records_emitted += 1;
        if !rated {
            self.identity_only += 1;
        }
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn pages_attempted(&self) -> u64 {
        self.index.attempted + self.directories.attempted + self.details.attempted
    }

    pub fn pages_succeeded(&self) -> u64 {
        self.index.succeeded + self.directories.succeeded + self.details.succeeded
    }

    pub fn pages_skipped(&self) -> u64 {
        self.index.skipped + self.directories.skipped + self.details.skipped
    }

    pub fn links_filtered(&self) -> u64 {
        self.index.filtered + self.directories.filtered + self.details.filtered
    }

    /// Number of skips with the given reason
    pub fn skipped_count(&self, reason: SkipReason) -> u64 {
        self.skipped_by_reason.get(&reason).copied().unwrap_or(0)
    }

    /// Wall-clock duration, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }

    /// Share of started fetches that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_attempted();
        if attempted == 0 {
            return 0.0;
        }
        (self.pages_succeeded() as f64 / attempted as f64) * 100.0
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Run:");
    println!("  Started: {}", report.started_at.to_rfc3339());
    if let Some(finished) = report.finished_at {
        println!("  Finished: {}", finished.to_rfc3339());
    }
    if let Some(duration) = report.duration_seconds() {
        println!("  Duration: {}s", duration);
    }
    println!("  Config hash: {}", report.config_hash);
    println!("  Schema version: {}", report.schema_version);
    if report.cancelled {
        println!("  Status: cancelled");
    }
    println!();

    println!("Pages by Tier:");
    for tier in [Tier::Index, Tier::Directory, Tier::Detail] {
        let stats = report.tier(tier);
        println!(
            "  {:<10} attempted {:>6}  succeeded {:>6}  skipped {:>6}  filtered {:>6}",
            tier.as_str(),
            stats.attempted,
            stats.succeeded,
            stats.skipped,
            stats.filtered
        );
    }
    println!();

    println!("Records:");
    println!("  Emitted: {}", report.records_emitted);
    println!("  Identity only: {}", report.identity_only);
    println!();

    if !report.skipped_by_reason.is_empty() {
        println!("Skipped by Reason:");
        let mut counts: Vec<_> = report.skipped_by_reason.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));
        for (reason, count) in counts {
            println!("  {}: {}", reason.as_str(), count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} fetches)",
        report.success_rate(),
        report.pages_succeeded(),
        report.pages_attempted()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_is_empty() {
        let report = CrawlReport::new("abc", "v1");
        assert_eq!(report.pages_attempted(), 0);
        assert_eq!(report.pages_skipped(), 0);
        assert_eq!(report.success_rate(), 0.0);
        assert!(report.finished_at.is_none());
    }

    #[test]
    fn test_tier_totals() {
        let mut report = CrawlReport::new("abc", "v1");
        report.record_attempt(Tier::Index);
        report.record_success(Tier::Index);
        for _ in 0..4 {
            report.record_attempt(Tier::Detail);
        }
        report.record_success(Tier::Detail);
        report.record_success(Tier::Detail);
        report.record_skip("https://x/1", Tier::Detail, SkipReason::DeadLink, "404");
        report.record_skip("https://x/2", Tier::Detail, SkipReason::SchemaMismatch, "no name");
        report.record_skip("https://y/", Tier::Directory, SkipReason::RequestLimitHit, "");

        assert_eq!(report.pages_attempted(), 5);
        assert_eq!(report.pages_succeeded(), 3);
        assert_eq!(report.pages_skipped(), 3);
        assert_eq!(report.details.skipped, 2);
        assert_eq!(report.skipped_count(SkipReason::DeadLink), 1);
        assert_eq!(report.skipped_count(SkipReason::Cancelled), 0);
        assert!((report.success_rate() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_filtered_links_stay_out_of_tier_skips() {
        let mut report = CrawlReport::new("abc", "v1");
        report.record_attempt(Tier::Detail);
        report.record_success(Tier::Detail);
        report.record_filtered("https://elsewhere.org/", Tier::Detail, SkipReason::OffDomain);
        report.record_filtered("https://x/private", Tier::Detail, SkipReason::RobotsDenied);

        assert_eq!(report.details.skipped, 0);
        assert_eq!(report.details.filtered, 2);
        assert_eq!(report.links_filtered(), 2);
        assert_eq!(
            report.details.attempted,
            report.details.succeeded + report.details.skipped
        );
        assert_eq!(report.skipped_count(SkipReason::OffDomain), 1);
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_identity_only_counting() {
        let mut report = CrawlReport::new("abc", "v1");
        report.record_emitted(true);
        report.record_emitted(false);
        assert_eq!(report.records_emitted, 2);
        assert_eq!(report.identity_only, 1);
    }

    #[test]
    fn test_finish_sets_duration() {
        let mut report = CrawlReport::new("abc", "v1");
        report.finish();
        assert!(report.duration_seconds().is_some_and(|d| d >= 0));
    }
}
