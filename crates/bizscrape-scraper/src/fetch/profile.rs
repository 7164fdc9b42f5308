//! Browser-like request headers and block-page detection.

use rand::seq::IndexedRandom;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER,
    USER_AGENT,
};
use reqwest::Url;

use super::origin::referer_for;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

const ACCEPT_LANGUAGES: [&str; 3] = [
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-US,en;q=0.8,fr;q=0.6",
];

/// Only the head of the body is inspected; challenge pages put their
/// markers in the title or first heading.
const BLOCK_SCAN_BYTES: usize = 1_500;

const BLOCK_MARKERS: [&str; 8] = [
    "just a moment",
    "attention required",
    "checking your browser",
    "cf-chl",
    "are you a human",
    "access denied",
    "bot detection",
    "enable javascript to continue",
];

/// Picks a user agent per request and derives the matching header set.
#[derive(Debug, Clone)]
pub(crate) struct RequestProfile {
    user_agents: Vec<String>,
}

impl RequestProfile {
    pub(crate) fn new(user_agents: Vec<String>) -> Self {
        Self { user_agents }
    }

    pub(crate) fn headers_for(&self, url: &Url) -> HeaderMap {
        let mut rng = rand::rng();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        if let Some(language) = ACCEPT_LANGUAGES.choose(&mut rng) {
            headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(*language));
        }
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        if let Ok(referer) = HeaderValue::from_str(&referer_for(url)) {
            headers.insert(REFERER, referer);
        }

        let Some(user_agent) = self.user_agents.choose(&mut rng) else {
            return headers;
        };
        match HeaderValue::from_str(user_agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(e) => {
                tracing::warn!(error = %e, "configured user agent is not a valid header value");
            }
        }
        for (name, value) in client_hints(user_agent) {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        headers
    }
}

/// `Sec-CH-UA` hints consistent with the user agent. Safari and Firefox do
/// not send them, so only Chromium agents get any.
fn client_hints(user_agent: &str) -> Vec<(&'static str, &'static str)> {
    if !user_agent.contains("Chrome/") {
        return Vec::new();
    }
    let platform = if user_agent.contains("Windows") {
        "\"Windows\""
    } else if user_agent.contains("Macintosh") {
        "\"macOS\""
    } else {
        "\"Linux\""
    };
    vec![
        (
            "sec-ch-ua",
            "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", platform),
    ]
}

/// Returns the block marker found near the top of `body`, if any.
pub(crate) fn detect_block(body: &str) -> Option<&'static str> {
    let mut end = body.len().min(BLOCK_SCAN_BYTES);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    let head = body[..end].to_lowercase();
    BLOCK_MARKERS
        .iter()
        .copied()
        .find(|marker| head.contains(marker))
}
