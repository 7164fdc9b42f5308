//! Origin and host helpers for outbound requests.

use reqwest::Url;

/// Scheme + host (+ non-default port) of `url` with a trailing slash, used
/// as the `Referer` so requests look like in-site navigation.
///
/// Given `"https://example.com/listings/42?page=2"`, returns
/// `"https://example.com/"`.
#[must_use]
pub fn referer_for(url: &Url) -> String {
    format!("{}/", url.origin().ascii_serialization())
}

/// Key used for per-host pacing: lowercase host plus explicit port.
pub(super) fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    }
}
