//! Scheduled scrape runs and their audit trail.
//!
//! [`ScrapeScheduler`] owns a tokio timer loop that scrapes the configured
//! seed URLs on a fixed interval, plus a manual trigger used by the HTTP
//! surface and the CLI. At most one run is in flight at a time; a trigger
//! that arrives while a run is active is rejected, not queued. Every run,
//! successful or not, ends with a [`ScrapeRunAudit`] handed to the
//! [`RunStore`].

mod clock;
mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bizscrape_core::{SchedulerSettings, ScrapeRunAudit, ScrapeRunResult, TriggerSource};
use bizscrape_scraper::{CancellationToken, Orchestrator, ScrapeRequest};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

pub use clock::{Clock, SystemClock};
pub use store::{PgRunStore, RunStore};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("a scrape run is already in progress")]
    AlreadyRunning,
    /// The pipeline failed as a whole. The failure has already been audited.
    #[error("scrape run failed: {0}")]
    Failed(String),
}

/// Holds the single run slot; releasing it on drop covers panics and
/// early returns alike.
struct RunGuard(Arc<AtomicBool>);

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScrapeScheduler {
    inner: Arc<Inner>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    orchestrator: Arc<Orchestrator>,
    store: Option<Arc<dyn RunStore>>,
    settings: SchedulerSettings,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl ScrapeScheduler {
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Option<Arc<dyn RunStore>>,
        settings: SchedulerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                orchestrator,
                store,
                settings,
                clock,
                running: Arc::new(AtomicBool::new(false)),
                shutdown: CancellationToken::new(),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Whether the timer loop may run: enabled in settings and backed by a
    /// persistence target.
    #[must_use]
    pub fn timer_enabled(&self) -> bool {
        self.inner.settings.enabled && self.inner.store.is_some()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Spawns the timer loop. Does nothing when the timer is disabled or
    /// already started.
    pub fn start(&self) {
        if !self.inner.settings.enabled {
            tracing::info!("scheduler disabled; scheduled runs will not fire");
            return;
        }
        if self.inner.store.is_none() {
            tracing::warn!("no persistence target configured; scheduled runs disabled");
            return;
        }

        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() {
            return;
        }
        *timer = Some(tokio::spawn(timer_loop(Arc::clone(&self.inner))));
    }

    /// Stops the timer loop and waits for it to exit. A run in flight is
    /// cancelled; its unfinished URLs are audited as cancelled.
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "scheduler loop exited abnormally");
            }
        }
    }

    /// Runs the seed list once, now.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::AlreadyRunning`] if another run holds the
    /// slot, or [`TriggerError::Failed`] if the pipeline failed as a whole.
    pub async fn trigger(&self, source: TriggerSource) -> Result<ScrapeRunResult, TriggerError> {
        self.inner.trigger(source).await
    }
}

impl Inner {
    async fn trigger(
        self: &Arc<Self>,
        source: TriggerSource,
    ) -> Result<ScrapeRunResult, TriggerError> {
        let guard = RunGuard::acquire(&self.running).ok_or(TriggerError::AlreadyRunning)?;
        let inner = Arc::clone(self);
        // The run task owns the guard, so a caller that stops waiting does
        // not free the slot while the run is still going.
        tokio::spawn(async move { inner.run_once(source, guard).await })
            .await
            .unwrap_or_else(|e| Err(TriggerError::Failed(e.to_string())))
    }

    async fn run_once(
        &self,
        source: TriggerSource,
        _guard: RunGuard,
    ) -> Result<ScrapeRunResult, TriggerError> {
        let started_at = self.clock.now();
        tracing::info!(
            trigger = source.as_str(),
            seeds = self.settings.seed_urls.len(),
            "scrape run started"
        );

        match self.session().await {
            Ok(result) => {
                let persisted = self.persist_businesses(&result).await;
                let audit = ScrapeRunAudit::from_result(
                    &result,
                    source,
                    started_at,
                    self.clock.now(),
                    persisted,
                );
                tracing::info!(
                    trigger = source.as_str(),
                    requested = audit.requested_count,
                    succeeded = audit.succeeded_count,
                    businesses = audit.business_count,
                    duplicates = audit.duplicate_count,
                    persisted,
                    errors = audit.errors.len(),
                    "scrape run finished"
                );
                self.record(&audit).await;
                Ok(result)
            }
            Err(message) => {
                tracing::error!(trigger = source.as_str(), error = %message, "scrape run failed");
                let audit = ScrapeRunAudit::failed(
                    source,
                    self.settings.seed_urls.len(),
                    started_at,
                    self.clock.now(),
                    message.clone(),
                );
                self.record(&audit).await;
                Err(TriggerError::Failed(message))
            }
        }
    }

    /// Runs the orchestrator in its own task so a panic surfaces as an
    /// error here instead of tearing down the scheduler.
    async fn session(&self) -> Result<ScrapeRunResult, String> {
        let seeds = &self.settings.seed_urls;
        // The seed list is operator configuration and is not held to the
        // per-request URL cap.
        let request =
            ScrapeRequest::new(seeds, None, seeds.len().max(1)).map_err(|e| e.to_string())?;
        let orchestrator = Arc::clone(&self.orchestrator);
        let cancel = self.shutdown.child_token();

        tokio::spawn(async move { orchestrator.run(&request, cancel).await })
            .await
            .map_err(describe_join_error)
    }

    async fn persist_businesses(&self, result: &ScrapeRunResult) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        match store.save_businesses(&result.businesses).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "failed to persist businesses");
                0
            }
        }
    }

    async fn record(&self, audit: &ScrapeRunAudit) {
        let Some(store) = &self.store else {
            tracing::debug!(public_id = %audit.public_id, "no persistence target; audit not stored");
            return;
        };
        if let Err(e) = store.record_run(audit).await {
            tracing::error!(public_id = %audit.public_id, error = %e, "failed to record scrape run");
        }
    }
}

fn describe_join_error(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("scrape session aborted: {error}");
    }
    let payload = error.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("scrape session panicked: {detail}")
}

async fn timer_loop(inner: Arc<Inner>) {
    let period = inner.settings.interval.max(MIN_INTERVAL);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(interval_secs = period.as_secs(), "scheduler started");

    loop {
        tokio::select! {
            () = inner.shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if inner.settings.seed_urls.is_empty() {
            tracing::warn!("no seed URLs configured; skipping scheduled run");
            continue;
        }

        match inner.trigger(TriggerSource::Schedule).await {
            Ok(_) => {}
            Err(TriggerError::AlreadyRunning) => {
                tracing::info!("previous run still in flight; tick skipped");
            }
            // Already audited and logged by the run itself.
            Err(TriggerError::Failed(_)) => {}
        }
    }

    tracing::info!("scheduler stopped");
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
