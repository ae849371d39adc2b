use std::fmt;

use chrono::{DateTime, Utc};
use prunarr_model::{CandidateId, RuleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::QueueName;

/// Unique identifier for queued jobs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scan-job payload. `manual_trigger` distinguishes operator-initiated
/// scans from scheduler fires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJobPayload {
    pub rule_id: RuleId,
    pub manual_trigger: bool,
}

/// Deletion-job payload enqueued by the review surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionJobPayload {
    pub candidate_ids: Vec<CandidateId>,
    pub delete_files: bool,
    pub user_id: String,
}

/// Structured payload per job kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum JobPayload {
    Scan(ScanJobPayload),
    Deletion(DeletionJobPayload),
}

impl JobPayload {
    pub fn queue(&self) -> QueueName {
        match self {
            JobPayload::Scan(_) => QueueName::Maintenance,
            JobPayload::Deletion(_) => QueueName::Deletion,
        }
    }
}

/// Queue-visible job states.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Delayed,
    Active,
    Completed,
    Failed,
}

impl JobState {
    /// States in which a repeatable fire must not enqueue another run.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            JobState::Waiting | JobState::Delayed | JobState::Active
        )
    }
}

/// Durable envelope stored per job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: JobId,
    pub payload: JobPayload,
    pub attempts: u32,
    pub max_attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    pub available_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl JobRecord {
    pub fn new(payload: JobPayload) -> Self {
        let now = Utc::now();
        let max_attempts = payload.queue().settings().attempts;
        Self {
            id: JobId::new(),
            payload,
            attempts: 0,
            max_attempts,
            enqueued_at: now,
            available_at: now,
            last_error: None,
            finished_at: None,
            result: None,
        }
    }
}

/// Return value of a completed scan job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJobResult {
    pub candidates_found: i32,
}

/// Return value of a completed deletion job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionJobResult {
    pub deleted_count: u32,
    pub failed_count: u32,
    pub errors: Vec<String>,
}

/// Structured return value stored with a completed job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum JobResult {
    Scan(ScanJobResult),
    Deletion(DeletionJobResult),
}
