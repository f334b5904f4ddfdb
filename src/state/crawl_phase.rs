//! Crawl phase definitions for the three-tier traversal
//!
//! The crawl moves strictly forward: `Idle → FetchingIndex → FetchingDirectories
//! → FetchingDetails → Done`. A tier's URL set is fully discovered before the
//! next phase starts.

use std::fmt;

/// The orchestrator's current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrawlPhase {
    /// Nothing has been fetched yet
    Idle,

    /// Fetching the root alphabetical index
    FetchingIndex,

    /// Fetching the per-letter directory pages
    FetchingDirectories,

    /// Fetching and parsing charity detail pages
    FetchingDetails,

    /// Every discovered detail URL has been resolved
    Done,
}

impl CrawlPhase {
    /// Returns the only phase this one may move to, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::FetchingIndex),
            Self::FetchingIndex => Some(Self::FetchingDirectories),
            Self::FetchingDirectories => Some(Self::FetchingDetails),
            Self::FetchingDetails => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Returns true if moving to `to` is a legal transition
    pub fn can_transition_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingIndex => "fetching_index",
            Self::FetchingDirectories => "fetching_directories",
            Self::FetchingDetails => "fetching_details",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three link tiers of the site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Root alphabetical index
    Index,
    /// Per-letter directory page
    Directory,
    /// Charity detail page
    Detail,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Directory => "directory",
            Self::Detail => "detail",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
