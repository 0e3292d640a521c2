use serde::{Deserialize, Serialize};

use super::RecordResult;

/// Lifecycle of a batch sync job. `Pending` on enqueue, `Running` once
/// the first record has been processed, then one terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Partial,
    Accepted,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Partial | JobStatus::Accepted | JobStatus::Error
        )
    }
}

/// One batch job tracked in memory. Timestamps are epoch seconds,
/// matching what the frontend polls for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub status: JobStatus,
    pub results: Vec<RecordResult>,
    pub created_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<f64>,
}

impl Job {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            results: Vec::new(),
            created_at: now_epoch(),
            updated_at: None,
            completed_at: None,
        }
    }
}

/// Current time as fractional epoch seconds.
pub fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
