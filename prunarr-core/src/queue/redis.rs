use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::job::{
    DeletionJobPayload, JobId, JobPayload, JobRecord, JobResult, JobState,
    ScanJobPayload,
};
use super::scheduler::SchedulerEntry;
use super::{JobQueue, KEY_PREFIX, KeepPolicy, QueueName};
use crate::error::Result;

/// Atomically promotes due delayed jobs into the wait list, then moves the
/// oldest waiting job onto the active list.
const DEQUEUE_SCRIPT: &str = r#"
local due = redis.call('ZRANGEBYSCORE', KEYS[2], '-inf', ARGV[1])
for i = 1, #due do
  redis.call('RPUSH', KEYS[1], due[i])
  redis.call('ZREM', KEYS[2], due[i])
end
return redis.call('RPOPLPUSH', KEYS[1], KEYS[3])
"#;

/// What happened to a failed job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryDisposition {
    /// Re-queued onto the delayed set with exponential backoff.
    Retried { delay: Duration },
    /// Attempts exhausted (or the error was permanent); parked in the
    /// failed set.
    DeadLettered,
}

/// Rate-limiter verdict for starting one more job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RateDecision {
    Proceed,
    Wait(Duration),
}

/// Redis-backed queue. The connection manager is created on first use;
/// constructing the queue never touches the network.
pub struct RedisQueue {
    url: String,
    conn: OnceCell<ConnectionManager>,
}

impl fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisQueue")
            .field("url", &self.url)
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

impl RedisQueue {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: OnceCell::new(),
        }
    }

    /// Builds a queue from `REDIS_URL`, defaulting to the local instance.
    /// Safe to call in Redis-less environments thanks to lazy connection.
    pub fn from_env() -> Self {
        Self::new(crate::config::EngineConfig::from_env().redis_url)
    }

    async fn conn(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                info!(url = %self.url, "connecting to Redis");
                let client = redis::Client::open(self.url.as_str())?;
                ConnectionManager::new(client).await
            })
            .await?;
        Ok(conn.clone())
    }

    fn queue_key(queue: QueueName, part: &str) -> String {
        format!("{KEY_PREFIX}:{}:{part}", queue.as_str())
    }

    fn job_key(queue: QueueName, id: &str) -> String {
        format!("{KEY_PREFIX}:{}:job:{id}", queue.as_str())
    }

    fn schedulers_key() -> String {
        format!("{KEY_PREFIX}:schedulers")
    }

    pub async fn enqueue(&self, payload: JobPayload) -> Result<JobId> {
        let queue = payload.queue();
        let job = JobRecord::new(payload);
        let encoded = serde_json::to_string(&job)?;
        let id = job.id.to_string();

        let mut conn = self.conn().await?;
        let _: () = conn.set(Self::job_key(queue, &id), encoded).await?;
        let _: () = conn
            .lpush(Self::queue_key(queue, "wait"), &id)
            .await?;
        debug!(queue = %queue, job = %job.id, "job enqueued");
        Ok(job.id)
    }

    /// Pops the next ready job, promoting due delayed jobs first.
    pub(crate) async fn dequeue(
        &self,
        queue: QueueName,
    ) -> Result<Option<JobRecord>> {
        let mut conn = self.conn().await?;
        let id: Option<String> = Script::new(DEQUEUE_SCRIPT)
            .key(Self::queue_key(queue, "wait"))
            .key(Self::queue_key(queue, "delayed"))
            .key(Self::queue_key(queue, "active"))
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await?;

        let Some(id) = id else {
            return Ok(None);
        };

        let encoded: Option<String> =
            conn.get(Self::job_key(queue, &id)).await?;
        let Some(encoded) = encoded else {
            // Record expired out from under its queue entry; drop the id.
            warn!(queue = %queue, job = %id, "dequeued job without a record");
            let _: i64 = conn
                .lrem(Self::queue_key(queue, "active"), 1, &id)
                .await?;
            return Ok(None);
        };

        Ok(Some(serde_json::from_str(&encoded)?))
    }

    pub(crate) async fn complete(
        &self,
        job: &JobRecord,
        result: &JobResult,
    ) -> Result<()> {
        let queue = job.payload.queue();
        let settings = queue.settings();
        let id = job.id.to_string();
        let now = Utc::now();

        let mut finished = job.clone();
        finished.finished_at = Some(now);
        finished.result = Some(result.clone());
        let encoded = serde_json::to_string(&finished)?;

        let mut conn = self.conn().await?;
        let _: i64 = conn
            .lrem(Self::queue_key(queue, "active"), 1, &id)
            .await?;
        let _: () = conn
            .set_ex(
                Self::job_key(queue, &id),
                encoded,
                settings.keep_completed.max_age.as_secs(),
            )
            .await?;
        let _: () = conn
            .zadd(
                Self::queue_key(queue, "completed"),
                &id,
                now.timestamp_millis(),
            )
            .await?;
        self.trim(&mut conn, queue, "completed", settings.keep_completed)
            .await?;
        let _: i64 = conn.del(Self::queue_key(queue, &format!("progress:{id}"))).await?;
        let _: i64 = conn.del(Self::queue_key(queue, &format!("cancel:{id}"))).await?;
        debug!(queue = %queue, job = %job.id, "job completed");
        Ok(())
    }

    /// Records a failure: retryable errors go back onto the delayed set
    /// with exponential backoff until attempts are exhausted; permanent
    /// errors dead-letter immediately.
    pub(crate) async fn fail(
        &self,
        job: &mut JobRecord,
        error: &str,
        retryable: bool,
    ) -> Result<RetryDisposition> {
        let queue = job.payload.queue();
        let settings = queue.settings();
        let id = job.id.to_string();
        let now = Utc::now();

        job.attempts += 1;
        job.last_error = Some(error.to_string());

        let mut conn = self.conn().await?;
        let _: i64 = conn
            .lrem(Self::queue_key(queue, "active"), 1, &id)
            .await?;

        if retryable && job.attempts < job.max_attempts {
            let delay = settings.backoff_base * 2u32.pow(job.attempts - 1);
            job.available_at =
                now + chrono::Duration::milliseconds(delay.as_millis() as i64);
            let encoded = serde_json::to_string(job)?;
            let _: () = conn.set(Self::job_key(queue, &id), encoded).await?;
            let _: () = conn
                .zadd(
                    Self::queue_key(queue, "delayed"),
                    &id,
                    job.available_at.timestamp_millis(),
                )
                .await?;
            warn!(
                queue = %queue,
                job = %job.id,
                attempts = job.attempts,
                delay_ms = delay.as_millis() as u64,
                error,
                "job failed, retrying with backoff"
            );
            Ok(RetryDisposition::Retried { delay })
        } else {
            job.finished_at = Some(now);
            let encoded = serde_json::to_string(job)?;
            let _: () = conn
                .set_ex(
                    Self::job_key(queue, &id),
                    encoded,
                    settings.keep_failed.max_age.as_secs(),
                )
                .await?;
            let _: () = conn
                .zadd(
                    Self::queue_key(queue, "failed"),
                    &id,
                    now.timestamp_millis(),
                )
                .await?;
            self.trim(&mut conn, queue, "failed", settings.keep_failed)
                .await?;
            warn!(
                queue = %queue,
                job = %job.id,
                attempts = job.attempts,
                error,
                "job dead-lettered"
            );
            Ok(RetryDisposition::DeadLettered)
        }
    }

    async fn trim(
        &self,
        conn: &mut ConnectionManager,
        queue: QueueName,
        set: &str,
        policy: KeepPolicy,
    ) -> Result<()> {
        let key = Self::queue_key(queue, set);
        let cutoff = Utc::now().timestamp_millis()
            - policy.max_age.as_millis() as i64;
        let _: i64 = conn.zrembyscore(&key, i64::MIN, cutoff).await?;
        let count: i64 = conn.zcard(&key).await?;
        if count > policy.max_entries {
            let excess = (count - policy.max_entries - 1) as isize;
            let _: i64 = conn.zremrangebyrank(&key, 0, excess).await?;
        }
        Ok(())
    }

    pub(crate) async fn set_progress(
        &self,
        queue: QueueName,
        id: JobId,
        percent: u8,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(
                Self::queue_key(queue, &format!("progress:{id}")),
                percent as i64,
                60 * 60,
            )
            .await?;
        Ok(())
    }

    /// Last reported progress of a job, if any.
    pub async fn progress(
        &self,
        queue: QueueName,
        id: JobId,
    ) -> Result<Option<u8>> {
        let mut conn = self.conn().await?;
        let value: Option<i64> = conn
            .get(Self::queue_key(queue, &format!("progress:{id}")))
            .await?;
        Ok(value.map(|v| v.clamp(0, 100) as u8))
    }

    /// Flags a job for cooperative cancellation; a running scan stops at
    /// its next between-items checkpoint.
    pub async fn request_cancel(
        &self,
        queue: QueueName,
        id: JobId,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .set_ex(
                Self::queue_key(queue, &format!("cancel:{id}")),
                1i64,
                60 * 60,
            )
            .await?;
        Ok(())
    }

    pub(crate) async fn cancel_requested(
        &self,
        queue: QueueName,
        id: JobId,
    ) -> Result<bool> {
        let mut conn = self.conn().await?;
        let flagged: bool = conn
            .exists(Self::queue_key(queue, &format!("cancel:{id}")))
            .await?;
        Ok(flagged)
    }

    /// Counts this worker against the queue's rate limit. Returns how long
    /// to wait when the window is exhausted.
    pub(crate) async fn acquire_rate_slot(
        &self,
        queue: QueueName,
    ) -> Result<RateDecision> {
        let Some(limit) = queue.settings().rate_limit else {
            return Ok(RateDecision::Proceed);
        };

        let key = Self::queue_key(queue, "ratelimit");
        let mut conn = self.conn().await?;
        let count: i64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: bool = conn
                .pexpire(&key, limit.window.as_millis() as i64)
                .await?;
        }
        if count > limit.max_jobs as i64 {
            // Give back the slot we are not going to use.
            let _: i64 = conn.decr(&key, 1).await?;
            let ttl: i64 = conn.pttl(&key).await?;
            let wait = if ttl > 0 {
                Duration::from_millis(ttl as u64)
            } else {
                limit.window
            };
            Ok(RateDecision::Wait(wait))
        } else {
            Ok(RateDecision::Proceed)
        }
    }

    async fn job_state_impl(
        &self,
        queue: QueueName,
        id: JobId,
    ) -> Result<Option<JobState>> {
        let id = id.to_string();
        let mut conn = self.conn().await?;

        let active: Vec<String> = conn
            .lrange(Self::queue_key(queue, "active"), 0, -1)
            .await?;
        if active.contains(&id) {
            return Ok(Some(JobState::Active));
        }

        let waiting: Vec<String> = conn
            .lrange(Self::queue_key(queue, "wait"), 0, -1)
            .await?;
        if waiting.contains(&id) {
            return Ok(Some(JobState::Waiting));
        }

        let delayed: Option<f64> = conn
            .zscore(Self::queue_key(queue, "delayed"), &id)
            .await?;
        if delayed.is_some() {
            return Ok(Some(JobState::Delayed));
        }

        let completed: Option<f64> = conn
            .zscore(Self::queue_key(queue, "completed"), &id)
            .await?;
        if completed.is_some() {
            return Ok(Some(JobState::Completed));
        }

        let failed: Option<f64> = conn
            .zscore(Self::queue_key(queue, "failed"), &id)
            .await?;
        if failed.is_some() {
            return Ok(Some(JobState::Failed));
        }

        Ok(None)
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue_scan(&self, payload: ScanJobPayload) -> Result<JobId> {
        self.enqueue(JobPayload::Scan(payload)).await
    }

    async fn enqueue_deletion(
        &self,
        payload: DeletionJobPayload,
    ) -> Result<JobId> {
        self.enqueue(JobPayload::Deletion(payload)).await
    }

    async fn job_state(
        &self,
        queue: QueueName,
        id: JobId,
    ) -> Result<Option<JobState>> {
        self.job_state_impl(queue, id).await
    }

    async fn upsert_scheduler(&self, entry: SchedulerEntry) -> Result<()> {
        let encoded = serde_json::to_string(&entry)?;
        let mut conn = self.conn().await?;
        let _: () = conn
            .hset(Self::schedulers_key(), &entry.scheduler_id, encoded)
            .await?;
        Ok(())
    }

    async fn remove_scheduler(&self, scheduler_id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: i64 = conn.hdel(Self::schedulers_key(), scheduler_id).await?;
        Ok(())
    }

    async fn list_schedulers(&self) -> Result<Vec<SchedulerEntry>> {
        let mut conn = self.conn().await?;
        let raw: HashMap<String, String> =
            conn.hgetall(Self::schedulers_key()).await?;

        let mut entries = Vec::with_capacity(raw.len());
        for (scheduler_id, encoded) in raw {
            match serde_json::from_str::<SchedulerEntry>(&encoded) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(
                    scheduler = %scheduler_id,
                    error = %err,
                    "dropping unreadable scheduler entry"
                ),
            }
        }
        entries.sort_by(|a, b| a.scheduler_id.cmp(&b.scheduler_id));
        Ok(entries)
    }
}
