//! One scrape session: fetch every URL, extract, normalize, deduplicate.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use bizscrape_core::{ErrorStage, ScrapeErrorEntry, ScrapeMeta, ScrapeRunResult, ScraperSettings};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::dedup::RecordSet;
use crate::error::{FetchError, ScraperError, ValidationError};
use crate::extract::{Extractor, Page};
use crate::fetch::{FetchController, FetchOutcome, Transport};
use crate::request::ScrapeRequest;

/// Runs scrape sessions against a shared fetch controller.
///
/// The controller's concurrency ceiling is shared by every session on the
/// same orchestrator, so concurrent HTTP requests and scheduled runs never
/// exceed it in aggregate.
pub struct Orchestrator {
    fetcher: FetchController,
    extractor: Extractor,
    settings: ScraperSettings,
}

/// Mutable state of a session in progress. Only the session loop touches it.
struct SessionState {
    records: RecordSet,
    errors: Vec<ScrapeErrorEntry>,
    succeeded: usize,
}

impl Orchestrator {
    /// # Errors
    ///
    /// Returns [`ScraperError::Client`] if the HTTP client cannot be built.
    pub fn new(settings: ScraperSettings) -> Result<Self, ScraperError> {
        let fetcher = FetchController::new(&settings)?;
        Ok(Self::from_parts(settings, fetcher))
    }

    #[must_use]
    pub fn with_transport(settings: ScraperSettings, transport: Arc<dyn Transport>) -> Self {
        let fetcher = FetchController::with_transport(&settings, transport);
        Self::from_parts(settings, fetcher)
    }

    fn from_parts(settings: ScraperSettings, fetcher: FetchController) -> Self {
        let extractor = Extractor::new(&settings);
        tracing::debug!(strategies = ?extractor.strategy_names(), "extractor ready");
        Self {
            extractor,
            fetcher,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ScraperSettings {
        &self.settings
    }

    /// Validates raw input against this orchestrator's URL limit.
    ///
    /// # Errors
    ///
    /// See [`ScrapeRequest::new`].
    pub fn validate<I, S>(
        &self,
        urls: I,
        max_concurrency: Option<usize>,
    ) -> Result<ScrapeRequest, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ScrapeRequest::new(urls, max_concurrency, self.settings.request_max_urls)
    }

    /// Validates and runs a session with no external cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Validation`] if the input is rejected; no
    /// network activity happens in that case.
    pub async fn scrape_urls<I, S>(
        &self,
        urls: I,
        max_concurrency: Option<usize>,
    ) -> Result<ScrapeRunResult, ScraperError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let request = self.validate(urls, max_concurrency)?;
        Ok(self.run(&request, CancellationToken::new()).await)
    }

    /// Runs one session to completion, cancellation, or the configured
    /// session timeout, whichever comes first.
    ///
    /// Per-URL failures never abort the session. On cancellation, fetches
    /// still in flight are dropped and every unfinished URL gets a
    /// [`FetchError::Cancelled`] entry; records already folded are kept.
    pub async fn run(&self, request: &ScrapeRequest, cancel: CancellationToken) -> ScrapeRunResult {
        let started = Instant::now();
        let bound = self.fetcher.effective_concurrency(request.max_concurrency());
        tracing::info!(urls = request.len(), concurrency = bound, "scrape session started");

        let mut state = SessionState {
            records: RecordSet::new(&self.settings),
            errors: Vec::new(),
            succeeded: 0,
        };
        let mut pending: HashSet<&str> = request.urls().iter().map(String::as_str).collect();

        let deadline = async {
            match self.settings.session_timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let mut interrupted = None;
        {
            let outcomes = self
                .fetcher
                .fetch_all(request.urls(), request.max_concurrency());
            tokio::pin!(outcomes);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        interrupted = Some("cancelled");
                        break;
                    }
                    () = &mut deadline => {
                        interrupted = Some("session timeout");
                        break;
                    }
                    next = outcomes.next() => match next {
                        Some(outcome) => {
                            pending.remove(outcome.url());
                            self.absorb(outcome, &mut state);
                        }
                        None => break,
                    },
                }
            }
        }

        if let Some(reason) = interrupted {
            tracing::warn!(
                reason,
                unfinished = pending.len(),
                "scrape session interrupted"
            );
            for url in request.urls() {
                if pending.contains(url.as_str()) {
                    state.errors.push(ScrapeErrorEntry {
                        url: url.clone(),
                        message: FetchError::Cancelled.to_string(),
                        stage: ErrorStage::Cancelled,
                    });
                }
            }
        }

        let duplicates = state.records.duplicates();
        let rejected = state.records.rejected();
        let businesses = state.records.into_records();
        let meta = ScrapeMeta {
            total_requested: request.len(),
            total_succeeded: state.succeeded,
            total_businesses: businesses.len(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            requested = meta.total_requested,
            succeeded = meta.total_succeeded,
            businesses = meta.total_businesses,
            duplicates,
            rejected,
            errors = state.errors.len(),
            duration_ms = meta.duration_ms,
            "scrape session finished"
        );

        ScrapeRunResult {
            businesses,
            errors: state.errors,
            meta,
            duplicates,
        }
    }

    fn absorb(&self, outcome: FetchOutcome, state: &mut SessionState) {
        match outcome {
            FetchOutcome::Success(page) => {
                state.succeeded += 1;
                let candidates = self
                    .extractor
                    .candidates(&Page::new(&page.final_url, &page.body));
                let found = candidates.len();
                for candidate in candidates {
                    state.records.fold(candidate);
                }
                tracing::debug!(url = %page.url, candidates = found, "page extracted");
            }
            FetchOutcome::Failure { url, error, attempts } => {
                tracing::debug!(url, attempts, error = %error, "recording fetch failure");
                state.errors.push(ScrapeErrorEntry {
                    url,
                    message: error.to_string(),
                    stage: ErrorStage::Fetch,
                });
            }
        }
    }
}
