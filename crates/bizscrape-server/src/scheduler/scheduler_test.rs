use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bizscrape_core::{
    BusinessRecord, ErrorStage, SchedulerSettings, ScrapeRunAudit, ScraperSettings, TriggerSource,
};
use bizscrape_db::DbError;
use bizscrape_scraper::{FetchError, Orchestrator, Transport, TransportRequest, TransportResponse};
use chrono::{DateTime, TimeZone, Utc};

use super::{Clock, RunStore, ScrapeScheduler, TriggerError};

/// Serves one JSON-LD business per URL after `delay`.
struct StubTransport {
    delay: Duration,
    calls: AtomicU32,
    panic_on_call: bool,
}

impl StubTransport {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicU32::new(0),
            panic_on_call: false,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, request: TransportRequest) -> Result<TransportResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panic_on_call, "transport exploded");
        tokio::time::sleep(self.delay).await;
        let path = request.url.path().to_string();
        Ok(TransportResponse {
            status: 200,
            final_url: request.url.to_string(),
            body: format!(
                r#"<html><head><script type="application/ld+json">
                {{"@type":"LocalBusiness","name":"Business at {path}","url":"{url}"}}
                </script></head><body></body></html>"#,
                url = request.url,
            ),
        })
    }
}

/// Each call advances one second from a fixed origin.
struct StepClock {
    origin: DateTime<Utc>,
    ticks: AtomicI64,
}

impl StepClock {
    fn new() -> Self {
        Self {
            origin: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("valid date"),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.origin + chrono::Duration::seconds(n)
    }
}

#[derive(Default)]
struct MemoryRunStore {
    audits: Mutex<Vec<ScrapeRunAudit>>,
    saved: Mutex<Vec<BusinessRecord>>,
    fail_audits: AtomicBool,
}

impl MemoryRunStore {
    fn audits(&self) -> Vec<ScrapeRunAudit> {
        self.audits.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn save_businesses(&self, records: &[BusinessRecord]) -> Result<usize, DbError> {
        self.saved.lock().unwrap().extend_from_slice(records);
        Ok(records.len())
    }

    async fn record_run(&self, audit: &ScrapeRunAudit) -> Result<(), DbError> {
        if self.fail_audits.load(Ordering::SeqCst) {
            return Err(DbError::NotFound);
        }
        self.audits.lock().unwrap().push(audit.clone());
        Ok(())
    }
}

fn scraper_settings() -> ScraperSettings {
    ScraperSettings {
        backoff_base: Duration::ZERO,
        host_min_interval: Duration::ZERO,
        ..ScraperSettings::default()
    }
}

fn scheduler_settings(seeds: &[&str]) -> SchedulerSettings {
    SchedulerSettings {
        enabled: true,
        interval: Duration::from_secs(60),
        seed_urls: seeds.iter().map(|s| (*s).to_string()).collect(),
    }
}

const SEEDS: [&str; 2] = ["https://seed.test/listing/1", "https://seed.test/listing/2"];

fn scheduler(
    transport: Arc<StubTransport>,
    store: Option<Arc<MemoryRunStore>>,
    settings: SchedulerSettings,
) -> ScrapeScheduler {
    let orchestrator = Arc::new(Orchestrator::with_transport(
        scraper_settings(),
        transport as Arc<dyn Transport>,
    ));
    ScrapeScheduler::new(
        orchestrator,
        store.map(|s| s as Arc<dyn RunStore>),
        settings,
        Arc::new(StepClock::new()),
    )
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_records_audit_and_persists() {
    let transport = Arc::new(StubTransport::new(Duration::from_millis(10)));
    let store = Arc::new(MemoryRunStore::default());
    let scheduler = scheduler(transport, Some(store.clone()), scheduler_settings(&SEEDS));

    let result = scheduler
        .trigger(TriggerSource::Manual)
        .await
        .expect("run succeeds");

    assert_eq!(result.businesses.len(), 2);
    let audits = store.audits();
    assert_eq!(audits.len(), 1);
    let audit = &audits[0];
    assert_eq!(audit.trigger, TriggerSource::Manual);
    assert_eq!(audit.requested_count, 2);
    assert_eq!(audit.succeeded_count, 2);
    assert_eq!(audit.business_count, 2);
    assert_eq!(audit.persisted_count, 2);
    assert_eq!(audit.duration_ms(), 1_000);
    assert!(audit.error_message.is_none());
    assert_eq!(store.saved.lock().unwrap().len(), 2);
    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn overlapping_trigger_is_rejected() {
    let transport = Arc::new(StubTransport::new(Duration::from_secs(5)));
    let store = Arc::new(MemoryRunStore::default());
    let scheduler = Arc::new(scheduler(
        transport,
        Some(store.clone()),
        scheduler_settings(&SEEDS),
    ));

    let first = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.trigger(TriggerSource::Manual).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(scheduler.is_running());

    let second = scheduler.trigger(TriggerSource::Manual).await;
    assert_eq!(second, Err(TriggerError::AlreadyRunning));

    first.await.expect("join").expect("first run succeeds");
    assert_eq!(store.audits().len(), 1);
    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn audit_failure_does_not_fail_the_run() {
    let transport = Arc::new(StubTransport::new(Duration::from_millis(1)));
    let store = Arc::new(MemoryRunStore::default());
    store.fail_audits.store(true, Ordering::SeqCst);
    let scheduler = scheduler(transport, Some(store.clone()), scheduler_settings(&SEEDS));

    let result = scheduler.trigger(TriggerSource::Manual).await;
    assert!(result.is_ok());

    // The slot is free again for the next run.
    store.fail_audits.store(false, Ordering::SeqCst);
    assert!(scheduler.trigger(TriggerSource::Manual).await.is_ok());
    assert_eq!(store.audits().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn panicking_session_becomes_failed_audit() {
    let transport = Arc::new(StubTransport {
        panic_on_call: true,
        ..StubTransport::new(Duration::ZERO)
    });
    let store = Arc::new(MemoryRunStore::default());
    let scheduler = scheduler(transport, Some(store.clone()), scheduler_settings(&SEEDS));

    let result = scheduler.trigger(TriggerSource::Schedule).await;
    assert!(matches!(result, Err(TriggerError::Failed(ref msg)) if msg.contains("panicked")));

    let audits = store.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].business_count, 0);
    assert_eq!(audits[0].requested_count, 2);
    assert!(audits[0]
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("transport exploded")));
    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn empty_seed_list_is_audited_as_failure() {
    let transport = Arc::new(StubTransport::new(Duration::ZERO));
    let store = Arc::new(MemoryRunStore::default());
    let scheduler = scheduler(transport.clone(), Some(store.clone()), scheduler_settings(&[]));

    let result = scheduler.trigger(TriggerSource::Manual).await;
    assert!(matches!(result, Err(TriggerError::Failed(_))));
    assert_eq!(store.audits()[0].business_count, 0);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn timer_fires_each_interval_until_stopped() {
    let transport = Arc::new(StubTransport::new(Duration::from_millis(5)));
    let store = Arc::new(MemoryRunStore::default());
    let scheduler = scheduler(transport, Some(store.clone()), scheduler_settings(&SEEDS));

    scheduler.start();
    // Starting twice keeps a single loop.
    scheduler.start();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(store.audits().len(), 1);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.audits().len(), 2);
    assert!(store
        .audits()
        .iter()
        .all(|a| a.trigger == TriggerSource::Schedule));

    scheduler.stop().await;
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(store.audits().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn timer_stays_idle_without_persistence_target() {
    let transport = Arc::new(StubTransport::new(Duration::ZERO));
    let scheduler = scheduler(transport.clone(), None, scheduler_settings(&SEEDS));
    assert!(!scheduler.timer_enabled());

    scheduler.start();
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(transport.calls(), 0);

    // Manual runs still work.
    let result = scheduler
        .trigger(TriggerSource::Manual)
        .await
        .expect("manual run");
    assert_eq!(result.meta.total_succeeded, 2);
    scheduler.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_the_run_in_flight() {
    let transport = Arc::new(StubTransport::new(Duration::from_secs(3_600)));
    let store = Arc::new(MemoryRunStore::default());
    let scheduler = scheduler(transport, Some(store.clone()), scheduler_settings(&SEEDS));

    scheduler.start();
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(scheduler.is_running());

    scheduler.stop().await;

    let audits = store.audits();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].business_count, 0);
    assert_eq!(audits[0].errors.len(), 2);
    assert!(audits[0]
        .errors
        .iter()
        .all(|e| e.stage == ErrorStage::Cancelled));
}
