//! Database operations for the `scrape_runs` audit table.

use bizscrape_core::ScrapeRunAudit;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{to_i32, DbError};

const RUN_COLUMNS: &str = "id, public_id, trigger_source, started_at, finished_at, duration_ms, \
     requested_count, succeeded_count, business_count, duplicate_count, persisted_count, \
     error_count, error_details, error_message, created_at";

/// A row from the `scrape_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub requested_count: i32,
    pub succeeded_count: i32,
    pub business_count: i32,
    /// Candidates dropped by the deduplicator during the session.
    pub duplicate_count: i32,
    pub persisted_count: i32,
    pub error_count: i32,
    /// The per-URL error entries as a JSON array of `{url, error, stage}`.
    pub error_details: serde_json::Value,
    /// Set only when the pipeline failed as a whole.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inserts one audit row and returns it.
///
/// # Errors
///
/// Returns [`DbError::CountOutOfRange`] if a count does not fit the column,
/// [`DbError::Json`] if the error entries cannot be serialized, or
/// [`DbError::Sqlx`] if the insert fails.
pub async fn insert_scrape_run(
    pool: &PgPool,
    audit: &ScrapeRunAudit,
) -> Result<ScrapeRunRow, DbError> {
    let error_details = serde_json::to_value(&audit.errors)?;

    let row = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "INSERT INTO scrape_runs \
             (public_id, trigger_source, started_at, finished_at, duration_ms, \
              requested_count, succeeded_count, business_count, duplicate_count, \
              persisted_count, error_count, error_details, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::jsonb, $13) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(audit.public_id)
    .bind(audit.trigger.as_str())
    .bind(audit.started_at)
    .bind(audit.finished_at)
    .bind(audit.duration_ms())
    .bind(to_i32("requested_count", audit.requested_count)?)
    .bind(to_i32("succeeded_count", audit.succeeded_count)?)
    .bind(to_i32("business_count", audit.business_count)?)
    .bind(to_i32("duplicate_count", audit.duplicate_count)?)
    .bind(to_i32("persisted_count", audit.persisted_count)?)
    .bind(to_i32("error_count", audit.errors.len())?)
    .bind(error_details)
    .bind(audit.error_message.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the most recent runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scrape_runs(pool: &PgPool, limit: i64) -> Result<Vec<ScrapeRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches one run by its public id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such run exists, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_scrape_run(pool: &PgPool, public_id: Uuid) -> Result<ScrapeRunRow, DbError> {
    sqlx::query_as::<_, ScrapeRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM scrape_runs WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}
