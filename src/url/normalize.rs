use crate::UrlError;
use url::Url;

/// Query parameters that never change which charity a page describes
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a discovered URL into the key used to de-duplicate fetches
///
/// # Normalization Steps
///
/// 1. Reject anything that is not HTTP(S) or has no host
/// 2. Remove the fragment (everything after #)
/// 3. Remove tracking query parameters (`utm_*`, `fbclid`, ...), keeping the
///    order of the remaining ones since the site routes on `bay=` / `orgid=`
/// 4. Remove an empty query string
///
/// Host lowercasing, default ports and dot segments are already handled by
/// [`Url::parse`] and [`Url::join`].
///
/// # Examples
///
/// ```
/// use url::Url;
/// use charity_crawler::url::normalize_url;
///
/// let url = Url::parse("https://WWW.Example.org/index.cfm?bay=search.summary&orgid=7&utm_source=x#top").unwrap();
/// let normalized = normalize_url(&url).unwrap();
/// assert_eq!(normalized.as_str(), "https://www.example.org/index.cfm?bay=search.summary&orgid=7");
/// ```
pub fn normalize_url(url: &Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    let mut url = url.clone();
    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Parses and normalizes a URL string
pub fn parse_and_normalize(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_url(&url)
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
