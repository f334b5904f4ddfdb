use std::time::{Duration, Instant};

/// Tracks the request budget and spacing for one host
///
/// Fetches reserve a start slot instead of polling: each reservation pushes the
/// host's next free slot forward by the configured spacing, so concurrent
/// fetches to the same host queue up in order without holding a lock while
/// they wait.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests reserved for this host in the current crawl
    pub request_count: u32,

    /// Earliest instant the next request to this host may start
    pub next_slot: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if this host has used up its request budget
    pub fn has_exceeded_limit(&self, max_requests: u32) -> bool {
        self.request_count >= max_requests
    }

    /// Reserves the next request slot
    ///
    /// Returns the instant at which the caller may send its request. The slot
    /// after it is at least `spacing` later, or unchanged if that instant is
    /// not representable.
    pub fn reserve(&mut self, now: Instant, spacing: Duration) -> Instant {
        let start = match self.next_slot {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        self.next_slot = Some(start.checked_add(spacing).unwrap_or(start));
        self.request_count += 1;
        start
    }
}
