//! Session results and the audit snapshot recorded for each scheduled run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::listing::BusinessRecord;

/// Pipeline stage at which a per-URL error was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    Fetch,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeErrorEntry {
    pub url: String,
    #[serde(rename = "error")]
    pub message: String,
    pub stage: ErrorStage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeMeta {
    pub total_requested: usize,
    pub total_succeeded: usize,
    pub total_businesses: usize,
    pub duration_ms: u64,
}

/// Aggregate output of one scrape session.
///
/// `duplicates` is the number of candidates the deduplicator dropped; it is
/// not part of the wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRunResult {
    pub businesses: Vec<BusinessRecord>,
    pub errors: Vec<ScrapeErrorEntry>,
    pub meta: ScrapeMeta,
    #[serde(skip)]
    pub duplicates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Schedule,
    Manual,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Schedule => "schedule",
            TriggerSource::Manual => "manual",
        }
    }
}

/// Immutable record of one scheduler run, handed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRunAudit {
    pub public_id: Uuid,
    pub trigger: TriggerSource,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub requested_count: usize,
    pub succeeded_count: usize,
    pub business_count: usize,
    pub duplicate_count: usize,
    pub persisted_count: usize,
    pub errors: Vec<ScrapeErrorEntry>,
    /// Set only when the pipeline failed as a whole.
    pub error_message: Option<String>,
}

impl ScrapeRunAudit {
    #[must_use]
    pub fn from_result(
        result: &ScrapeRunResult,
        trigger: TriggerSource,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        persisted_count: usize,
    ) -> Self {
        Self {
            public_id: Uuid::new_v4(),
            trigger,
            started_at,
            finished_at,
            requested_count: result.meta.total_requested,
            succeeded_count: result.meta.total_succeeded,
            business_count: result.businesses.len(),
            duplicate_count: result.duplicates,
            persisted_count,
            errors: result.errors.clone(),
            error_message: None,
        }
    }

    /// Audit for a run whose pipeline failed outright: zero businesses and
    /// `error_message` set.
    #[must_use]
    pub fn failed(
        trigger: TriggerSource,
        requested_count: usize,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            public_id: Uuid::new_v4(),
            trigger,
            started_at,
            finished_at,
            requested_count,
            succeeded_count: 0,
            business_count: 0,
            duplicate_count: 0,
            persisted_count: 0,
            errors: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn sample_result() -> ScrapeRunResult {
        ScrapeRunResult {
            businesses: vec![BusinessRecord {
                title: Some("Sample Business".to_string()),
                ..BusinessRecord::default()
            }],
            errors: vec![ScrapeErrorEntry {
                url: "https://example.com/broken".to_string(),
                message: "unexpected HTTP status 500".to_string(),
                stage: ErrorStage::Fetch,
            }],
            meta: ScrapeMeta {
                total_requested: 2,
                total_succeeded: 1,
                total_businesses: 1,
                duration_ms: 40,
            },
            duplicates: 3,
        }
    }

    #[test]
    fn result_serializes_to_wire_shape() {
        let json = serde_json::to_value(sample_result()).expect("serialize");
        assert_eq!(json["meta"]["totalRequested"], 2);
        assert_eq!(json["meta"]["durationMs"], 40);
        assert_eq!(json["errors"][0]["error"], "unexpected HTTP status 500");
        assert_eq!(json["errors"][0]["stage"], "fetch");
        assert!(json.get("duplicates").is_none());
    }

    #[test]
    fn audit_from_result_copies_counts() {
        let started = Utc::now();
        let finished = started + Duration::milliseconds(1_250);
        let audit = ScrapeRunAudit::from_result(
            &sample_result(),
            TriggerSource::Schedule,
            started,
            finished,
            1,
        );
        assert_eq!(audit.requested_count, 2);
        assert_eq!(audit.succeeded_count, 1);
        assert_eq!(audit.business_count, 1);
        assert_eq!(audit.duplicate_count, 3);
        assert_eq!(audit.persisted_count, 1);
        assert_eq!(audit.errors.len(), 1);
        assert!(audit.error_message.is_none());
        assert_eq!(audit.duration_ms(), 1_250);
    }

    #[test]
    fn failed_audit_has_zero_businesses() {
        let now = Utc::now();
        let audit = ScrapeRunAudit::failed(TriggerSource::Manual, 4, now, now, "boom");
        assert_eq!(audit.business_count, 0);
        assert_eq!(audit.requested_count, 4);
        assert_eq!(audit.error_message.as_deref(), Some("boom"));
        assert_eq!(audit.trigger.as_str(), "manual");
    }
}
