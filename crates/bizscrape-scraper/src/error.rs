use thiserror::Error;

/// Failure of the pipeline as a whole (as opposed to a single URL).
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Rejection of a scrape request before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one URL is required")]
    Empty,

    #[error("too many URLs: {count} requested, at most {max} allowed")]
    TooMany { count: usize, max: usize },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("maxConcurrency must be at least 1")]
    InvalidConcurrency,
}

/// Terminal failure for one URL after the retry policy gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request blocked by target site ({marker})")]
    Blocked { marker: String },

    #[error("cancelled before completion")]
    Cancelled,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Transient conditions worth another attempt: timeouts, transport
    /// failures, HTTP 429 and 5xx.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Status { status } => *status == 429 || (500..=599).contains(status),
            FetchError::Timeout { .. } | FetchError::Transport(_) => true,
            FetchError::Blocked { .. } | FetchError::Cancelled | FetchError::InvalidUrl(_) => {
                false
            }
        }
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { timeout_ms }
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Reported by an extraction strategy that could not read a page at all.
/// Never surfaces to callers; the strategy simply contributes no signals.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed structured metadata: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("unreadable markup: {0}")]
    Markup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_statuses() {
        assert!(FetchError::Status { status: 429 }.is_retriable());
        assert!(FetchError::Status { status: 500 }.is_retriable());
        assert!(FetchError::Status { status: 503 }.is_retriable());
        assert!(!FetchError::Status { status: 404 }.is_retriable());
        assert!(!FetchError::Status { status: 403 }.is_retriable());
    }

    #[test]
    fn network_failures_are_retriable() {
        assert!(FetchError::Timeout { timeout_ms: 10 }.is_retriable());
        assert!(FetchError::Transport("connection reset".to_owned()).is_retriable());
    }

    #[test]
    fn hard_failures_are_not_retriable() {
        assert!(!FetchError::Blocked {
            marker: "captcha".to_owned()
        }
        .is_retriable());
        assert!(!FetchError::Cancelled.is_retriable());
        assert!(!FetchError::InvalidUrl("x".to_owned()).is_retriable());
    }

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            FetchError::Status { status: 500 }.to_string(),
            "unexpected HTTP status 500"
        );
        assert_eq!(
            ValidationError::TooMany { count: 60, max: 50 }.to_string(),
            "too many URLs: 60 requested, at most 50 allowed"
        );
    }
}
