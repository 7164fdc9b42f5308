//! Text, URL and price canonicalization applied to every candidate before
//! junk filtering and deduplication.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[£$€]|\b(?:AUD|CAD|USD|EUR|GBP|SGD|AED)\b)\s?\d[\d,.]*(?:\s?(?:k|m|million))?\b")
        .expect("valid regex")
});

/// Query parameters that only identify the visitor or campaign.
/// Generic names such as `ref` or `id` are kept: listing sites use them as
/// the listing identifier.
const TRACKING_PARAMS: [&str; 10] = [
    "gclid", "fbclid", "msclkid", "dclid", "yclid", "igshid", "mc_cid", "mc_eid", "_ga", "_gl",
];

/// Trims and collapses internal whitespace runs to a single space.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapsed text, or `None` if nothing remains.
#[must_use]
pub fn clean_field(value: Option<String>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
}

/// Lowercased, whitespace-collapsed form used for title comparison.
#[must_use]
pub fn fold_title(title: &str) -> String {
    collapse_whitespace(title).to_lowercase()
}

/// Canonical form of an absolute http(s) URL: scheme and host lowercased,
/// fragment dropped, tracking parameters (`utm_*`, `gclid`, ...) removed,
/// trailing slash removed. Returns `None` for anything that is not an
/// absolute http(s) URL.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);

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

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_owned();
        url.set_path(&trimmed);
    }

    let mut out = url.to_string();
    if url.path() == "/" && url.query().is_none() {
        out.pop();
    }
    Some(out)
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Resolves `raw` (absolute or relative) against `base`.
///
/// Returns `None` for fragment-only references and non-navigable schemes
/// (`mailto:`, `javascript:`, `tel:`, `data:`).
#[must_use]
pub fn resolve_url(raw: &str, base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let lower = raw.to_ascii_lowercase();
    if ["mailto:", "javascript:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }
    let resolved = match Url::parse(raw) {
        Ok(url) => url,
        Err(_) => Url::parse(base).ok()?.join(raw).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// The first currency-prefixed amount in `text`, e.g. `"£250,000"` out of
/// `"Asking price: £250,000 ono"`.
#[must_use]
pub fn extract_price(text: &str) -> Option<String> {
    PRICE_RE
        .find(text)
        .map(|m| collapse_whitespace(m.as_str()))
}

/// Canonical price text: the currency amount when one is present, the
/// collapsed input otherwise.
#[must_use]
pub fn normalize_price(text: &str) -> Option<String> {
    extract_price(text).or_else(|| clean_field(Some(text.to_owned())))
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
