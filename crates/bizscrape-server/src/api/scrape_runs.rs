use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeRunItem {
    run_id: Uuid,
    trigger_source: String,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    duration_ms: i64,
    requested_count: i32,
    succeeded_count: i32,
    business_count: i32,
    duplicate_count: i32,
    persisted_count: i32,
    error_count: i32,
    errors: serde_json::Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<bizscrape_db::ScrapeRunRow> for ScrapeRunItem {
    fn from(row: bizscrape_db::ScrapeRunRow) -> Self {
        Self {
            run_id: row.public_id,
            trigger_source: row.trigger_source,
            started_at: row.started_at,
            finished_at: row.finished_at,
            duration_ms: row.duration_ms,
            requested_count: row.requested_count,
            succeeded_count: row.succeeded_count,
            business_count: row.business_count,
            duplicate_count: row.duplicate_count,
            persisted_count: row.persisted_count,
            error_count: row.error_count,
            errors: row.error_details,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

pub(super) async fn list_scrape_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ScrapeRunsQuery>,
) -> Result<Json<ApiResponse<Vec<ScrapeRunItem>>>, ApiError> {
    let Some(pool) = &state.pool else {
        return Err(ApiError::new(
            req_id.0,
            "unavailable",
            "no persistence target configured",
        ));
    };

    let rows = bizscrape_db::list_scrape_runs(pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ScrapeRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
