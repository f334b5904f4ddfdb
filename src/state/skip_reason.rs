//! Reasons a URL or page was resolved without producing output

use std::fmt;

/// Why a URL was skipped
///
/// Transport reasons are counted towards the consecutive-failure limit; the
/// others are policy or data outcomes and never escalate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    // ===== Transport =====
    /// HTTP 404 or 410
    DeadLink,

    /// Connection refused, DNS failure, TLS error or timeout
    Unreachable,

    /// HTTP 429
    RateLimited,

    /// Any other non-success HTTP status
    HttpError,

    /// Response was not HTML
    ContentMismatch,

    /// Body could not be read or another network failure
    NetworkError,

    // ===== Policy =====
    /// Host is outside the allowed domains (directly or after a redirect)
    OffDomain,

    /// Disallowed by robots.txt
    RobotsDenied,

    /// Host hit the configured request limit
    RequestLimitHit,

    /// Crawl was cancelled before the URL was fetched
    Cancelled,

    // ===== Data =====
    /// A required identity field could not be located on a detail page
    SchemaMismatch,
}

impl SkipReason {
    /// Returns true if this is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::DeadLink
                | Self::Unreachable
                | Self::RateLimited
                | Self::HttpError
                | Self::ContentMismatch
                | Self::NetworkError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeadLink => "dead_link",
            Self::Unreachable => "unreachable",
            Self::RateLimited => "rate_limited",
            Self::HttpError => "http_error",
            Self::ContentMismatch => "content_mismatch",
            Self::NetworkError => "network_error",
            Self::OffDomain => "off_domain",
            Self::RobotsDenied => "robots_denied",
            Self::RequestLimitHit => "request_limit_hit",
            Self::Cancelled => "cancelled",
            Self::SchemaMismatch => "schema_mismatch",
        }
    }

    pub fn all() -> [Self; 11] {
        [
            Self::DeadLink,
            Self::Unreachable,
            Self::RateLimited,
            Self::HttpError,
            Self::ContentMismatch,
            Self::NetworkError,
            Self::OffDomain,
            Self::RobotsDenied,
            Self::RequestLimitHit,
            Self::Cancelled,
            Self::SchemaMismatch,
        ]
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
