//! Per-queue worker pools.
//!
//! Each worker is a tokio task bound to one queue, pulling one job at a
//! time. Handler progress is forwarded through a watch channel (drop-latest
//! semantics, so a slow Redis write never backpressures the handler) and
//! interpolated into the job's overall percentage: 10% at start, the
//! handler's 0-100 mapped onto the remaining 90.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job::{
    DeletionJobResult, JobPayload, JobRecord, JobResult, ScanJobResult,
};
use super::redis::{RateDecision, RedisQueue};
use super::QueueName;
use crate::config::EngineConfig;
use crate::deletion::DeletionExecutor;
use crate::error::MaintenanceError;
use crate::scan::MaintenanceScanner;
use prunarr_model::ScanStatus;

enum Finish {
    Complete(JobResult),
    Fail { error: String, retryable: bool },
}

/// Owns the worker tasks for both queues.
pub struct QueueWorkers {
    queue: Arc<RedisQueue>,
    scanner: Arc<MaintenanceScanner>,
    executor: Arc<DeletionExecutor>,
    config: EngineConfig,
    shutdown: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for QueueWorkers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handle_count = self
            .handles
            .try_lock()
            .map(|handles| handles.len())
            .unwrap_or_default();
        f.debug_struct("QueueWorkers")
            .field("queue", &self.queue)
            .field("worker_count", &handle_count)
            .field("shutdown_cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}

impl QueueWorkers {
    pub fn new(
        queue: Arc<RedisQueue>,
        scanner: Arc<MaintenanceScanner>,
        executor: Arc<DeletionExecutor>,
        config: EngineConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            scanner,
            executor,
            config,
            shutdown,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawns each queue's worker pool at its configured concurrency.
    pub async fn start(&self) {
        let mut handles = self.handles.lock().await;
        for &queue_name in QueueName::all() {
            let settings = queue_name.settings();
            for index in 0..settings.concurrency {
                let worker_id = format!(
                    "{}-{}-w{}",
                    queue_name,
                    std::process::id(),
                    index
                );
                handles.push(tokio::spawn(worker_loop(
                    worker_id,
                    queue_name,
                    Arc::clone(&self.queue),
                    Arc::clone(&self.scanner),
                    Arc::clone(&self.executor),
                    self.config.worker_poll_interval,
                    self.shutdown.clone(),
                )));
            }
        }
    }

    /// Graceful stop: workers stop pulling, in-flight jobs run to
    /// completion, handles are awaited with a grace timeout. Best-effort;
    /// never panics.
    pub async fn shutdown(&self) {
        info!("stopping queue workers");
        self.shutdown.cancel();
        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            match tokio::time::timeout(self.config.shutdown_grace, handle)
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("worker task failed: {err:?}"),
                Err(_) => warn!("worker task timed out during shutdown"),
            }
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

async fn idle_wait(shutdown: &CancellationToken, delay: Duration) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker_id: String,
    queue_name: QueueName,
    queue: Arc<RedisQueue>,
    scanner: Arc<MaintenanceScanner>,
    executor: Arc<DeletionExecutor>,
    poll_interval: Duration,
    shutdown: CancellationToken,
) {
    info!(worker = %worker_id, "worker started");
    loop {
        if shutdown.is_cancelled() {
            info!(worker = %worker_id, "worker shutting down");
            break;
        }

        let job = match queue.dequeue(queue_name).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                idle_wait(&shutdown, poll_interval).await;
                continue;
            }
            Err(err) => {
                warn!(worker = %worker_id, error = %err, "dequeue failed");
                idle_wait(&shutdown, poll_interval.max(Duration::from_secs(5)))
                    .await;
                continue;
            }
        };

        // Honor the queue's rate limit without giving up the job already
        // held; a shutdown lets the held job run first.
        loop {
            match queue.acquire_rate_slot(queue_name).await {
                Ok(RateDecision::Proceed) => break,
                Ok(RateDecision::Wait(delay)) => {
                    if shutdown.is_cancelled() {
                        break;
                    }
                    debug!(
                        worker = %worker_id,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited"
                    );
                    tokio::time::sleep(delay.min(Duration::from_secs(5)))
                        .await;
                }
                Err(err) => {
                    warn!(worker = %worker_id, error = %err, "rate limiter unavailable");
                    break;
                }
            }
        }

        run_job(&queue, &scanner, &executor, job).await;
    }
}

async fn run_job(
    queue: &Arc<RedisQueue>,
    scanner: &Arc<MaintenanceScanner>,
    executor: &Arc<DeletionExecutor>,
    mut job: JobRecord,
) {
    let queue_name = job.payload.queue();
    let job_id = job.id;

    if let Err(err) = queue.set_progress(queue_name, job_id, 10).await {
        debug!(job = %job_id, error = %err, "failed to report start progress");
    }

    // Handler progress flows through a watch channel: send_replace never
    // blocks and the forwarder only ever sees the latest value.
    let (tx, mut rx) = tokio::sync::watch::channel(0u8);
    let forwarder = {
        let queue = Arc::clone(queue);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let handler_pct = *rx.borrow_and_update();
                let overall =
                    (10 + (handler_pct.min(100) as u32 * 90) / 100) as u8;
                if let Err(err) =
                    queue.set_progress(queue_name, job_id, overall).await
                {
                    debug!(job = %job_id, error = %err, "failed to report progress");
                }
            }
        })
    };
    let report = move |pct: u8| {
        let _ = tx.send_replace(pct);
    };

    let finish = match job.payload.clone() {
        JobPayload::Scan(payload) => {
            // Operator-requested cancellation is polled while the scan
            // runs; the scan observes it between items.
            let job_token = CancellationToken::new();
            let watcher = {
                let queue = Arc::clone(queue);
                let token = job_token.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                                match queue
                                    .cancel_requested(queue_name, job_id)
                                    .await
                                {
                                    Ok(true) => {
                                        token.cancel();
                                        break;
                                    }
                                    Ok(false) => {}
                                    Err(err) => {
                                        debug!(job = %job_id, error = %err, "cancel poll failed");
                                    }
                                }
                            }
                        }
                    }
                })
            };

            let outcome = scanner
                .scan(payload.rule_id, &job_token, Some(&report))
                .await;

            job_token.cancel();
            let _ = watcher.await;

            match outcome.status {
                ScanStatus::Completed => {
                    Finish::Complete(JobResult::Scan(ScanJobResult {
                        candidates_found: outcome.items_flagged,
                    }))
                }
                _ => Finish::Fail {
                    error: outcome.error.unwrap_or_else(|| {
                        MaintenanceError::Unknown.to_string()
                    }),
                    retryable: outcome.retryable,
                },
            }
        }
        JobPayload::Deletion(payload) => {
            let deletion = executor
                .execute(
                    &payload.candidate_ids,
                    payload.delete_files,
                    &payload.user_id,
                    Some(&report),
                )
                .await;

            if deletion.processed() == 0 && !deletion.errors.is_empty() {
                // Nothing transitioned, so retrying the whole job is safe.
                Finish::Fail {
                    error: deletion.errors.join("; "),
                    retryable: true,
                }
            } else {
                Finish::Complete(JobResult::Deletion(DeletionJobResult {
                    deleted_count: deletion.success,
                    failed_count: deletion.failed,
                    errors: deletion.errors,
                }))
            }
        }
    };

    drop(report);
    let _ = forwarder.await;

    match finish {
        Finish::Complete(result) => {
            if let Err(err) =
                queue.set_progress(queue_name, job_id, 100).await
            {
                debug!(job = %job_id, error = %err, "failed to report final progress");
            }
            if let Err(err) = queue.complete(&job, &result).await {
                error!(job = %job_id, error = %err, "failed to complete job");
            }
        }
        Finish::Fail { error, retryable } => {
            if let Err(err) = queue.fail(&mut job, &error, retryable).await {
                error!(job = %job_id, error = %err, "failed to record job failure");
            }
        }
    }
}
