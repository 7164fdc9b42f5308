//! Bounded, retrying, host-paced page fetching.

mod origin;
mod pacing;
mod profile;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use bizscrape_core::ScraperSettings;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Url;
use tokio::sync::Semaphore;

use crate::error::{FetchError, ScraperError};
use crate::retry::retry_with_backoff;

pub use origin::referer_for;
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

use pacing::HostPacer;
use profile::{detect_block, RequestProfile};

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL as requested.
    pub url: String,
    /// URL after redirects; relative links resolve against this.
    pub final_url: String,
    pub status: u16,
    pub body: String,
    pub attempts: u32,
}

/// Terminal result for one URL. Exactly one is produced per requested URL.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(FetchedPage),
    Failure {
        url: String,
        error: FetchError,
        attempts: u32,
    },
}

impl FetchOutcome {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            FetchOutcome::Success(page) => &page.url,
            FetchOutcome::Failure { url, .. } => url,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Success(page) => page.attempts,
            FetchOutcome::Failure { attempts, .. } => *attempts,
        }
    }
}

/// Retrieves pages under a process-wide concurrency ceiling.
///
/// Every attempt holds a permit from one shared semaphore, so concurrent
/// sessions on the same controller never exceed `max_concurrency` in-flight
/// requests between them. A session may ask for a lower bound, never a
/// higher one.
pub struct FetchController {
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    ceiling: usize,
    pacer: HostPacer,
    profile: RequestProfile,
    request_timeout: Duration,
    max_attempts: u32,
    backoff_base: Duration,
}

impl FetchController {
    /// Creates a controller backed by [`ReqwestTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Client`] if the HTTP client cannot be built.
    pub fn new(settings: &ScraperSettings) -> Result<Self, ScraperError> {
        let transport = ReqwestTransport::new(settings.request_timeout)?;
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    #[must_use]
    pub fn with_transport(settings: &ScraperSettings, transport: Arc<dyn Transport>) -> Self {
        let ceiling = settings.max_concurrency.max(1);
        Self {
            transport,
            permits: Arc::new(Semaphore::new(ceiling)),
            ceiling,
            pacer: HostPacer::new(settings.host_min_interval),
            profile: RequestProfile::new(settings.user_agents.clone()),
            request_timeout: settings.request_timeout,
            max_attempts: settings.max_attempts.max(1),
            backoff_base: settings.backoff_base,
        }
    }

    /// `min(requested, ceiling)`, never below 1.
    #[must_use]
    pub fn effective_concurrency(&self, requested: Option<usize>) -> usize {
        requested.map_or(self.ceiling, |n| n.clamp(1, self.ceiling))
    }

    /// Streams one [`FetchOutcome`] per URL, in completion order.
    ///
    /// Dropping the stream aborts every unfinished fetch.
    pub fn fetch_all<'a>(
        &'a self,
        urls: &'a [String],
        requested_concurrency: Option<usize>,
    ) -> impl Stream<Item = FetchOutcome> + 'a {
        let bound = self.effective_concurrency(requested_concurrency);
        stream::iter(urls)
            .map(move |url| self.fetch_one(url))
            .buffer_unordered(bound)
    }

    /// Fetches one URL under the retry policy.
    pub async fn fetch_one(&self, url: &str) -> FetchOutcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return FetchOutcome::Failure {
                    url: url.to_owned(),
                    error: FetchError::InvalidUrl(e.to_string()),
                    attempts: 0,
                }
            }
        };
        let host = origin::host_key(&parsed);

        let mut attempts = 0u32;
        let result = retry_with_backoff(self.max_attempts, self.backoff_base, || {
            attempts += 1;
            self.attempt(&parsed, &host)
        })
        .await;

        match result {
            Ok(response) => {
                tracing::debug!(url, attempts, status = response.status, "page fetched");
                FetchOutcome::Success(FetchedPage {
                    url: url.to_owned(),
                    final_url: response.final_url,
                    status: response.status,
                    body: response.body,
                    attempts,
                })
            }
            Err(error) => {
                tracing::warn!(url, attempts, error = %error, "fetch failed");
                FetchOutcome::Failure {
                    url: url.to_owned(),
                    error,
                    attempts,
                }
            }
        }
    }

    async fn attempt(&self, url: &Url, host: &str) -> Result<TransportResponse, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::Cancelled)?;
        self.pacer.wait_turn(host).await;

        let request = TransportRequest {
            url: url.clone(),
            headers: self.profile.headers_for(url),
            timeout: self.request_timeout,
        };
        // Bounds every transport, not only the reqwest one.
        let response = tokio::time::timeout(self.request_timeout, self.transport.get(request))
            .await
            .map_err(|_| FetchError::Timeout {
                timeout_ms: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        if !(200..300).contains(&response.status) {
            tracing::debug!(url = %url, host, status = response.status, "non-success status");
            return Err(FetchError::Status {
                status: response.status,
            });
        }
        if let Some(marker) = detect_block(&response.body) {
            return Err(FetchError::Blocked {
                marker: marker.to_owned(),
            });
        }
        Ok(response)
    }
}
