//! URL handling for the charity crawler
//!
//! This module provides URL normalization, host extraction, and the
//! allowed-domain boundary every fetch is checked against.

mod normalize;

pub use normalize::{normalize_url, parse_and_normalize};

use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use charity_crawler::url::extract_domain;
///
/// let url = Url::parse("https://WWW.CharityNavigator.org/index.cfm").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.charitynavigator.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a domain matches a pattern
///
/// `"example.org"` matches only itself; `"*.example.org"` matches the bare
/// domain and any subdomain at any depth.
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Returns true if `domain` falls inside any of the allowed patterns
///
/// # Examples
///
/// ```
/// use charity_crawler::url::is_allowed_domain;
///
/// let allowed = vec!["*.charitynavigator.org".to_string()];
/// assert!(is_allowed_domain("www.charitynavigator.org", &allowed));
/// assert!(!is_allowed_domain("charitynavigator.org.evil.com", &allowed));
/// ```
pub fn is_allowed_domain(domain: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|pattern| matches_wildcard(pattern, domain))
}

/// Returns true if the URL's host falls inside the allowed patterns
pub fn is_allowed_url(url: &Url, allowed: &[String]) -> bool {
    extract_domain(url).is_some_and(|domain| is_allowed_domain(&domain, allowed))
}
