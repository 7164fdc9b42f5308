use bizscrape_core::AppConfig;
use bizscrape_scraper::Orchestrator;

/// Runs one session over `urls` and writes the result to stdout as JSON.
///
/// # Errors
///
/// Returns an error if the input fails validation or the HTTP client cannot
/// be built. Per-URL failures are part of the printed result, not errors.
pub(crate) async fn run_scrape(
    config: &AppConfig,
    urls: &[String],
    max_concurrency: Option<usize>,
    pretty: bool,
) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(config.scraper_settings())?;
    let result = orchestrator.scrape_urls(urls, max_concurrency).await?;

    tracing::info!(
        requested = result.meta.total_requested,
        succeeded = result.meta.total_succeeded,
        businesses = result.meta.total_businesses,
        errors = result.errors.len(),
        "scrape complete"
    );

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");
    Ok(())
}
