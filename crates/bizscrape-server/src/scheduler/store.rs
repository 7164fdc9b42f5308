//! Persistence collaborator for scheduled and manual runs.

use async_trait::async_trait;
use bizscrape_core::{BusinessRecord, ScrapeRunAudit};
use bizscrape_db::DbError;
use sqlx::PgPool;

/// Where run output and audits end up.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Stores unique businesses and returns how many were new.
    async fn save_businesses(&self, records: &[BusinessRecord]) -> Result<usize, DbError>;

    async fn record_run(&self, audit: &ScrapeRunAudit) -> Result<(), DbError>;
}

/// Postgres-backed [`RunStore`].
#[derive(Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn save_businesses(&self, records: &[BusinessRecord]) -> Result<usize, DbError> {
        bizscrape_db::save_businesses(&self.pool, records).await
    }

    async fn record_run(&self, audit: &ScrapeRunAudit) -> Result<(), DbError> {
        let row = bizscrape_db::insert_scrape_run(&self.pool, audit).await?;
        tracing::debug!(run_id = row.id, public_id = %row.public_id, "scrape run recorded");
        Ok(())
    }
}
