//! Database operations for the `businesses` table.

use bizscrape_core::BusinessRecord;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `businesses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BusinessRow {
    pub id: i64,
    pub public_id: Uuid,
    pub title: Option<String>,
    pub listing_url: Option<String>,
    pub location: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub all_links: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Writes `records` in one transaction and returns how many rows were
/// inserted.
///
/// A record whose `listing_url` is already stored is skipped. Records
/// without a listing URL are always inserted, and records with no identity
/// at all are ignored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert or the commit fails; nothing is
/// written in that case.
pub async fn save_businesses(pool: &PgPool, records: &[BusinessRecord]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0usize;

    for record in records.iter().filter(|r| r.has_identity()) {
        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO businesses \
                 (public_id, title, listing_url, location, price, description, images, all_links) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (listing_url) WHERE listing_url IS NOT NULL DO NOTHING \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(record.title.as_deref())
        .bind(record.listing_url.as_deref())
        .bind(record.location.as_deref())
        .bind(record.price.as_deref())
        .bind(record.description.as_deref())
        .bind(&record.images)
        .bind(&record.all_links)
        .fetch_optional(&mut *tx)
        .await?;

        if id.is_some() {
            inserted += 1;
        } else {
            tracing::debug!(
                listing_url = record.listing_url.as_deref().unwrap_or_default(),
                "business already stored, skipping"
            );
        }
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Total number of stored businesses.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_businesses(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM businesses")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
