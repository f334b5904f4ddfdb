//! Politeness scheduling
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-host request spacing and request counting
//! - Integrating the robots.txt crawl delay into the spacing

use crate::config::CrawlerConfig;
use crate::state::{DomainState, SkipReason};
use crate::url::extract_domain;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

/// Permission to send one request
///
/// Holds a global concurrency permit until dropped. The request may start once
/// [`FetchSlot::wait`] returns.
#[derive(Debug)]
pub struct FetchSlot {
    /// Host the slot was reserved on
    pub domain: String,

    /// Instant the request may start
    pub start_at: Instant,

    _permit: OwnedSemaphorePermit,
}

impl FetchSlot {
    /// Sleeps until the reserved start instant
    pub async fn wait(&self) {
        let now = Instant::now();
        if self.start_at > now {
            tracing::trace!(
                "Waiting {:?} before next request to {}",
                self.start_at - now,
                self.domain
            );
            tokio::time::sleep_until(tokio::time::Instant::from_std(self.start_at)).await;
        }
    }
}

/// Scheduler enforces the crawl's politeness rules
///
/// The scheduler coordinates:
/// - Global concurrency limits (max fetches in flight)
/// - Per-host spacing (minimum time between requests)
/// - Per-host request counts (max requests per host)
///
/// Host state sits behind a plain mutex that is only held while reserving a
/// slot, never across an `.await`.
#[derive(Debug)]
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    /// Per-host state tracking
    domain_states: Mutex<HashMap<String, DomainState>>,

    /// Minimum time between two requests to the same host
    spacing: Duration,

    /// Request budget per host
    max_domain_requests: u32,
}

impl Scheduler {
    /// Creates a new scheduler from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            global_semaphore: Arc::new(Semaphore::new(config.max_concurrent_fetches as usize)),
            domain_states: Mutex::new(HashMap::new()),
            spacing: Duration::from_millis(config.minimum_time_between_requests),
            max_domain_requests: config.max_domain_requests,
        }
    }

    /// Raises the per-host spacing to a robots.txt crawl delay
    ///
    /// A delay shorter than the configured spacing is ignored.
    pub fn apply_crawl_delay(&mut self, delay: Duration) {
        if delay > self.spacing {
            tracing::info!(
                "robots.txt crawl delay {:?} exceeds configured spacing {:?}; using it",
                delay,
                self.spacing
            );
            self.spacing = delay;
        }
    }

    /// Returns the effective per-host spacing
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Reserves a slot for a request to `url`
    ///
    /// Waits for a global permit first, then books the host's next free start
    /// instant. The caller must [`FetchSlot::wait`] before sending.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchSlot)` - The request may proceed
    /// * `Err(SkipReason::RequestLimitHit)` - The host's request budget is spent
    /// * `Err(SkipReason::OffDomain)` - The URL has no host
    /// * `Err(SkipReason::Cancelled)` - The permit semaphore was closed
    pub async fn acquire(&self, url: &Url) -> Result<FetchSlot, SkipReason> {
        let domain = extract_domain(url).ok_or(SkipReason::OffDomain)?;

        let exhausted = self
            .lock_states()
            .get(&domain)
            .is_some_and(|s| s.has_exceeded_limit(self.max_domain_requests));
        if exhausted {
            return Err(SkipReason::RequestLimitHit);
        }

        let permit = self
            .global_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SkipReason::Cancelled)?;

        let start_at = {
            let mut states = self.lock_states();
            let state = states.entry(domain.clone()).or_insert_with(DomainState::new);
            if state.has_exceeded_limit(self.max_domain_requests) {
                return Err(SkipReason::RequestLimitHit);
            }
            state.reserve(Instant::now(), self.spacing)
        };

        Ok(FetchSlot {
            domain,
            start_at,
            _permit: permit,
        })
    }

    /// Total requests reserved across all hosts
    pub fn total_requests(&self) -> u32 {
        self.lock_states().values().map(|s| s.request_count).sum()
    }

    fn lock_states(&self) -> MutexGuard<'_, HashMap<String, DomainState>> {
        self.domain_states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
