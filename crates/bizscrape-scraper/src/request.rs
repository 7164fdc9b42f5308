use std::collections::HashSet;

use reqwest::Url;

use crate::error::ValidationError;

/// A validated batch of target URLs.
///
/// Construction trims entries, drops blanks and case-insensitive duplicates
/// (first spelling wins), and requires every URL to carry an http(s) scheme
/// and a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    urls: Vec<String>,
    max_concurrency: Option<usize>,
}

impl ScrapeRequest {
    /// # Errors
    ///
    /// - [`ValidationError::Empty`] when no non-blank URL remains.
    /// - [`ValidationError::TooMany`] when more than `max_urls` distinct URLs remain.
    /// - [`ValidationError::InvalidUrl`] for the first URL without a scheme or host.
    /// - [`ValidationError::InvalidConcurrency`] for `Some(0)`.
    pub fn new<I, S>(
        urls: I,
        max_concurrency: Option<usize>,
        max_urls: usize,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if max_concurrency == Some(0) {
            return Err(ValidationError::InvalidConcurrency);
        }

        let mut seen = HashSet::new();
        let mut cleaned = Vec::new();
        for raw in urls {
            let url = raw.as_ref().trim();
            if url.is_empty() {
                continue;
            }
            check_url(url)?;
            if seen.insert(url.to_lowercase()) {
                cleaned.push(url.to_owned());
            }
        }

        if cleaned.is_empty() {
            return Err(ValidationError::Empty);
        }
        if cleaned.len() > max_urls {
            return Err(ValidationError::TooMany {
                count: cleaned.len(),
                max: max_urls,
            });
        }

        Ok(Self {
            urls: cleaned,
            max_concurrency,
        })
    }

    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    #[must_use]
    pub fn max_concurrency(&self) -> Option<usize> {
        self.max_concurrency
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

fn check_url(url: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidUrl {
        url: url.to_owned(),
        reason: reason.to_owned(),
    };
    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}
