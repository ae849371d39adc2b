//! Durable two-queue job system backed by a shared Redis instance.
//!
//! The `maintenance` queue carries scan jobs, the `deletion` queue carries
//! deletion jobs; both live under the `{plex-manager}` hash-tag prefix so
//! every key hashes to one cluster slot. The Redis connection is lazy:
//! constructing a queue never touches the network, and Redis-less
//! environments can use [`NoopQueue`] instead.

pub mod job;
mod redis;
pub mod scheduler;
mod worker;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use job::{
    DeletionJobPayload, DeletionJobResult, JobId, JobPayload, JobRecord,
    JobResult, JobState, ScanJobPayload, ScanJobResult,
};
pub use redis::{RateDecision, RedisQueue, RetryDisposition};
pub use scheduler::{RuleScheduler, SchedulerEntry, SyncReport};
pub use worker::QueueWorkers;

/// Hash-tag prefix shared by every queue key (cluster-safe keying).
pub const KEY_PREFIX: &str = "{plex-manager}";

/// The two logical queues.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueName {
    Maintenance,
    Deletion,
}

impl QueueName {
    pub fn all() -> &'static [QueueName] {
        &[QueueName::Maintenance, QueueName::Deletion]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Maintenance => "maintenance",
            QueueName::Deletion => "deletion",
        }
    }

    /// Per-queue policy. Deletion concurrency is 1 by contract: only one
    /// deletion job runs at a time across the process.
    pub fn settings(&self) -> QueueSettings {
        match self {
            QueueName::Maintenance => QueueSettings {
                attempts: 3,
                backoff_base: Duration::from_secs(2),
                keep_completed: KeepPolicy {
                    max_entries: 100,
                    max_age: Duration::from_secs(24 * 60 * 60),
                },
                keep_failed: KeepPolicy {
                    max_entries: 1_000,
                    max_age: Duration::from_secs(7 * 24 * 60 * 60),
                },
                concurrency: 2,
                rate_limit: Some(RateLimit {
                    max_jobs: 10,
                    window: Duration::from_secs(60),
                }),
            },
            QueueName::Deletion => QueueSettings {
                attempts: 2,
                backoff_base: Duration::from_secs(5),
                keep_completed: KeepPolicy {
                    max_entries: 100,
                    max_age: Duration::from_secs(24 * 60 * 60),
                },
                keep_failed: KeepPolicy {
                    max_entries: 1_000,
                    max_age: Duration::from_secs(30 * 24 * 60 * 60),
                },
                concurrency: 1,
                rate_limit: None,
            },
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Retention policy for completed/failed job records.
#[derive(Clone, Copy, Debug)]
pub struct KeepPolicy {
    pub max_entries: i64,
    pub max_age: Duration,
}

/// Sliding-window rate limit on job starts.
#[derive(Clone, Copy, Debug)]
pub struct RateLimit {
    pub max_jobs: u32,
    pub window: Duration,
}

/// Per-queue policy bundle.
#[derive(Clone, Copy, Debug)]
pub struct QueueSettings {
    pub attempts: u32,
    pub backoff_base: Duration,
    pub keep_completed: KeepPolicy,
    pub keep_failed: KeepPolicy,
    pub concurrency: usize,
    pub rate_limit: Option<RateLimit>,
}

/// Producer-side queue surface used by the scheduler and the review UI
/// role. Worker internals (dequeue, completion, retries) live on
/// [`RedisQueue`] directly.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_scan(&self, payload: ScanJobPayload) -> Result<JobId>;

    async fn enqueue_deletion(
        &self,
        payload: DeletionJobPayload,
    ) -> Result<JobId>;

    async fn job_state(
        &self,
        queue: QueueName,
        id: JobId,
    ) -> Result<Option<JobState>>;

    async fn upsert_scheduler(&self, entry: SchedulerEntry) -> Result<()>;

    /// Idempotent: removing an unknown scheduler succeeds.
    async fn remove_scheduler(&self, scheduler_id: &str) -> Result<()>;

    async fn list_schedulers(&self) -> Result<Vec<SchedulerEntry>>;
}

/// Queue stand-in for environments without Redis: every operation
/// succeeds without enqueuing anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopQueue;

#[async_trait]
impl JobQueue for NoopQueue {
    async fn enqueue_scan(&self, _payload: ScanJobPayload) -> Result<JobId> {
        Ok(JobId::new())
    }

    async fn enqueue_deletion(
        &self,
        _payload: DeletionJobPayload,
    ) -> Result<JobId> {
        Ok(JobId::new())
    }

    async fn job_state(
        &self,
        _queue: QueueName,
        _id: JobId,
    ) -> Result<Option<JobState>> {
        Ok(None)
    }

    async fn upsert_scheduler(&self, _entry: SchedulerEntry) -> Result<()> {
        Ok(())
    }

    async fn remove_scheduler(&self, _scheduler_id: &str) -> Result<()> {
        Ok(())
    }

    async fn list_schedulers(&self) -> Result<Vec<SchedulerEntry>> {
        Ok(Vec::new())
    }
}
