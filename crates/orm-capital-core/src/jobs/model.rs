//! Job scheduling data model (§3, §4.9).

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Sync,
    Async,
    Auto,
}

/// Strictly monotonic: `queued -> running -> {completed | failed}` (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether `self -> next` is a legal forward transition.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub model_name: crate::types::Methodology,
    pub execution_mode: ExecutionMode,
    pub entity_id: String,
    pub calculation_date: chrono::NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters_overlay: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub run_id: String,
    pub status: JobStatus,
    pub execution_mode: ExecutionMode,
    pub progress_pct: u8,
    pub created_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::types::ErrorEnvelope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    pub webhook_delivered: bool,
    pub webhook_attempts: u32,
}

impl Job {
    pub fn new_queued(id: String, run_id: String, request: &CalculationRequest) -> Self {
        Self {
            id,
            run_id,
            status: JobStatus::Queued,
            execution_mode: request.execution_mode,
            progress_pct: 0,
            created_at: Utc::now().naive_utc(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            idempotency_key: request.idempotency_key.clone(),
            correlation_id: request.correlation_id.clone(),
            callback_url: request.callback_url.clone(),
            webhook_delivered: false,
            webhook_attempts: 0,
        }
    }
}
