//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate; the
//! `Crawl-delay` extension, which that crate ignores, is parsed here.

use robotstxt::DefaultMatcher;
use std::time::Duration;
use url::Url;

/// Largest crawl delay honored; longer values are clamped to it
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(120);

/// Parsed robots.txt data for one host
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns true if no rules were loaded
    pub fn is_allow_all(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to check
    /// * `user_agent` - The crawler's product token (e.g. "CharityCrawler")
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url.as_str())
    }

    /// Gets the crawl delay that applies to a user agent
    ///
    /// A group naming the agent wins over the `*` group. Agent names match
    /// case-insensitively as a substring of `user_agent`. Values above
    /// [`MAX_CRAWL_DELAY`] are clamped to it.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if self.is_allow_all() {
            return None;
        }

        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        // A user-agent line after any other directive starts a new group
        let mut group_open = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if !group_open {
                        group.clear();
                        group_open = true;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    let Some(delay) = value.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
                    else {
                        continue;
                    };
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        for_agent.get_or_insert(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        for_wildcard.get_or_insert(delay);
                    }
                }
                _ => group_open = false,
            }
        }

        for_agent.or(for_wildcard).map(|secs| {
            Duration::try_from_secs_f64(secs)
                .map_or(MAX_CRAWL_DELAY, |delay| delay.min(MAX_CRAWL_DELAY))
        })
    }
}
