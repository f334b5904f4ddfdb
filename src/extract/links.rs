//! Link discovery for index and directory pages
//!
//! Only anchors inside the rule's containers are followed. Links are resolved
//! against the page URL and normalized, then deduplicated within the page.
//!
//! **Skipped:**
//! - `javascript:`, `mailto:`, `tel:` and `data:` hrefs
//! - Fragment-only hrefs
//! - `<a download>` anchors
//! - Anything that is not http(s) after resolution

use crate::schema::CompiledLinkRule;
use crate::url::normalize_url;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use url::Url;

/// Outbound links of one page, in document order
///
/// A one-pass iterator: the page is parsed once and its links are consumed
/// once.
#[derive(Debug)]
pub struct DiscoveredLinks {
    links: std::vec::IntoIter<Url>,
}

impl Iterator for DiscoveredLinks {
    type Item = Url;

    fn next(&mut self) -> Option<Url> {
        self.links.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.links.size_hint()
    }
}

impl ExactSizeIterator for DiscoveredLinks {}

/// Finds the next-tier links on a listing page
///
/// # Arguments
///
/// * `html` - The page body
/// * `base` - The URL the page was served from, for resolving relative hrefs
/// * `rule` - Which containers and anchors hold the links
pub fn discover_links(html: &str, base: &Url, rule: &CompiledLinkRule) -> DiscoveredLinks {
    let document = Html::parse_document(html);

    let containers: Vec<ElementRef<'_>> = match rule.nth {
        Some(n) => document.select(&rule.container).nth(n).into_iter().collect(),
        None => document.select(&rule.container).collect(),
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for container in containers {
        for anchor in container.select(&rule.anchor) {
            if anchor.value().attr("download").is_some() {
                continue;
            }
            let Some(url) = anchor.value().attr("href").and_then(|h| resolve_link(h, base)) else {
                continue;
            };
            if seen.insert(url.as_str().to_string()) {
                links.push(url);
            }
        }
    }

    DiscoveredLinks {
        links: links.into_iter(),
    }
}

/// Resolves an href to a normalized absolute URL
///
/// Returns None for hrefs that should not be followed.
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    normalize_url(&absolute).ok()
}
