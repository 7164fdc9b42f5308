//! Seed-list ingest and run history for the CLI.
//!
//! A CLI ingest records the same audit row as a scheduled run, with trigger
//! source `manual`.

use bizscrape_core::{AppConfig, ScrapeRunAudit, TriggerSource};
use bizscrape_scraper::{CancellationToken, Orchestrator, ScrapeRequest};

/// Scrapes the configured seed URLs once, stores new businesses and the run
/// audit, and prints the result.
///
/// # Errors
///
/// Returns an error if no seeds are configured, the database is unreachable
/// (unless `dry_run`), or the audit cannot be written.
pub(crate) async fn run_ingest(config: &AppConfig, dry_run: bool) -> anyhow::Result<()> {
    let seeds = &config.seed_urls;
    if seeds.is_empty() {
        anyhow::bail!("BIZSCRAPE_SEED_URLS is empty; nothing to ingest");
    }

    let pool = if dry_run {
        None
    } else {
        let pool = bizscrape_db::connect_pool_from_config(config).await?;
        bizscrape_db::run_migrations(&pool).await?;
        Some(pool)
    };

    let orchestrator = Orchestrator::new(config.scraper_settings())?;
    let request = ScrapeRequest::new(seeds, None, seeds.len())?;

    let started_at = chrono::Utc::now();
    let result = orchestrator.run(&request, CancellationToken::new()).await;
    let finished_at = chrono::Utc::now();

    let Some(pool) = pool else {
        println!(
            "dry-run: {} businesses from {} of {} seed URLs ({} duplicates dropped, {} errors)",
            result.businesses.len(),
            result.meta.total_succeeded,
            result.meta.total_requested,
            result.duplicates,
            result.errors.len()
        );
        return Ok(());
    };

    let persisted = match bizscrape_db::save_businesses(&pool, &result.businesses).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "failed to persist businesses");
            0
        }
    };
    let audit = ScrapeRunAudit::from_result(
        &result,
        TriggerSource::Manual,
        started_at,
        finished_at,
        persisted,
    );
    let row = bizscrape_db::insert_scrape_run(&pool, &audit).await?;

    println!(
        "run {}: {} businesses ({} new) from {} of {} seed URLs; {} errors",
        row.public_id,
        row.business_count,
        row.persisted_count,
        row.succeeded_count,
        row.requested_count,
        row.error_count
    );
    for entry in &result.errors {
        println!("  {} [{:?}] {}", entry.url, entry.stage, entry.message);
    }
    Ok(())
}

/// Prints the most recent scrape runs, newest first.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the query fails.
pub(crate) async fn run_list_runs(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    let pool = bizscrape_db::connect_pool_from_config(config).await?;
    let rows = bizscrape_db::list_scrape_runs(&pool, limit.clamp(1, 200)).await?;

    if rows.is_empty() {
        println!("no scrape runs recorded");
        return Ok(());
    }

    for row in rows {
        let outcome = row.error_message.as_deref().unwrap_or("ok");
        println!(
            "{}  {:<8}  {:>6}ms  req={} ok={} biz={} dup={} new={} err={}  {}",
            row.started_at.format("%Y-%m-%d %H:%M:%S"),
            row.trigger_source,
            row.duration_ms,
            row.requested_count,
            row.succeeded_count,
            row.business_count,
            row.duplicate_count,
            row.persisted_count,
            row.error_count,
            outcome
        );
    }
    Ok(())
}
