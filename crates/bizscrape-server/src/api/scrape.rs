use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use bizscrape_core::{ScrapeRunResult, TriggerSource};
use bizscrape_scraper::ScraperError;
use serde::Deserialize;

use crate::middleware::RequestId;
use crate::scheduler::TriggerError;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ScrapeBody {
    urls: Vec<String>,
    #[serde(default)]
    max_concurrency: Option<usize>,
}

/// `POST /api/v1/scrape`: one session over the caller's URLs.
pub(super) async fn scrape(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<ScrapeBody>, JsonRejection>,
) -> Result<Json<ScrapeRunResult>, ApiError> {
    let Json(body) =
        body.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;

    match state
        .orchestrator
        .scrape_urls(&body.urls, body.max_concurrency)
        .await
    {
        Ok(result) => Ok(Json(result)),
        Err(ScraperError::Validation(e)) => {
            tracing::debug!(error = %e, "scrape request rejected");
            Err(ApiError::new(req_id.0, "validation_error", e.to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, "scrape request failed");
            Err(ApiError::new(req_id.0, "internal_error", "scrape failed"))
        }
    }
}

/// `POST /api/v1/ingest`: one audited run over the configured seed list.
pub(super) async fn ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ScrapeRunResult>, ApiError> {
    match state.scheduler.trigger(TriggerSource::Manual).await {
        Ok(result) => Ok(Json(result)),
        Err(e @ TriggerError::AlreadyRunning) => {
            Err(ApiError::new(req_id.0, "conflict", e.to_string()))
        }
        Err(e @ TriggerError::Failed(_)) => {
            Err(ApiError::new(req_id.0, "internal_error", e.to_string()))
        }
    }
}
