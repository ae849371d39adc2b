//! Cron-driven rule scheduling.
//!
//! Every enabled rule with a schedule owns one persistent scheduler entry
//! keyed `maintenance-rule-{ruleId}`. Entries live in Redis next to the
//! queues; the tick loop enqueues scan jobs as entries come due and
//! advances their next-fire time. The authoritative rule set is the
//! relational store: `sync_all` rebuilds every entry from it at worker
//! start-up.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use prunarr_model::RuleId;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job::{JobId, ScanJobPayload};
use super::{JobQueue, QueueName};
use crate::error::{MaintenanceError, Result};
use crate::store::MaintenanceStore;

/// Stable scheduler key for a rule.
pub fn scheduler_id(rule_id: RuleId) -> String {
    format!("maintenance-rule-{rule_id}")
}

/// Parses a standard 5-field cron expression (minute, hour, day-of-month,
/// month, day-of-week). The `cron` crate wants a seconds field, so one is
/// prepended.
pub fn parse_cron(pattern: &str) -> Result<cron::Schedule> {
    let trimmed = pattern.trim();
    if trimmed.split_whitespace().count() != 5 {
        return Err(MaintenanceError::RuleInvalid(format!(
            "invalid cron expression '{pattern}': expected 5 fields"
        )));
    }
    cron::Schedule::from_str(&format!("0 {trimmed}")).map_err(|err| {
        MaintenanceError::RuleInvalid(format!(
            "invalid cron expression '{pattern}': {err}"
        ))
    })
}

/// Save-time validation hook for rule schedules.
pub fn validate_schedule(pattern: &str) -> Result<()> {
    parse_cron(pattern).map(|_| ())
}

fn next_fire(pattern: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
    parse_cron(pattern)?.after(&after).next().ok_or_else(|| {
        MaintenanceError::RuleInvalid(format!(
            "cron expression '{pattern}' never fires"
        ))
    })
}

/// One persistent repeatable-job registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerEntry {
    pub scheduler_id: String,
    pub rule_id: RuleId,
    pub pattern: String,
    pub next: DateTime<Utc>,
    /// Most recently enqueued job for this entry; consulted so a fire is
    /// skipped while the previous run is still in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_job_id: Option<JobId>,
}

/// Outcome of a full scheduler synchronization.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
}

/// Maintains scheduler entries and fires due ones.
pub struct RuleScheduler {
    store: Arc<dyn MaintenanceStore>,
    queue: Arc<dyn JobQueue>,
}

impl fmt::Debug for RuleScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleScheduler").finish_non_exhaustive()
    }
}

impl RuleScheduler {
    pub fn new(
        store: Arc<dyn MaintenanceStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self { store, queue }
    }

    /// Upserts the entry when the rule is enabled and carries a schedule,
    /// removes it otherwise.
    pub async fn sync(
        &self,
        rule_id: RuleId,
        cron: Option<&str>,
        enabled: bool,
    ) -> Result<()> {
        let id = scheduler_id(rule_id);
        match cron {
            Some(pattern) if enabled => {
                let next = next_fire(pattern, Utc::now())?;
                // An unchanged pattern keeps its in-flight linkage.
                let last_job_id = self
                    .find_entry(&id)
                    .await?
                    .filter(|existing| existing.pattern == pattern)
                    .and_then(|existing| existing.last_job_id);
                self.queue
                    .upsert_scheduler(SchedulerEntry {
                        scheduler_id: id.clone(),
                        rule_id,
                        pattern: pattern.to_string(),
                        next,
                        last_job_id,
                    })
                    .await?;
                debug!(scheduler = %id, pattern, next = %next, "scheduler upserted");
            }
            _ => {
                self.queue.remove_scheduler(&id).await?;
                debug!(scheduler = %id, "scheduler removed");
            }
        }
        Ok(())
    }

    /// Idempotent removal of a rule's scheduler.
    pub async fn remove(&self, rule_id: RuleId) -> Result<()> {
        self.queue.remove_scheduler(&scheduler_id(rule_id)).await
    }

    /// Active registrations, sorted by scheduler id.
    pub async fn list_active(&self) -> Result<Vec<SchedulerEntry>> {
        self.queue.list_schedulers().await
    }

    async fn find_entry(&self, id: &str) -> Result<Option<SchedulerEntry>> {
        Ok(self
            .queue
            .list_schedulers()
            .await?
            .into_iter()
            .find(|entry| entry.scheduler_id == id))
    }

    /// Rebuilds one scheduler per enabled rule with a schedule, from the
    /// authoritative store. A rule that fails to sync is logged and does
    /// not abort the loop.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        let rules = self.store.find_scheduled_enabled_rules().await?;
        let mut report = SyncReport::default();
        for rule in rules {
            match self
                .sync(rule.id, rule.schedule.as_deref(), rule.enabled)
                .await
            {
                Ok(()) => report.synced += 1,
                Err(err) => {
                    warn!(
                        rule = %rule.id,
                        error = %err,
                        "failed to sync rule scheduler"
                    );
                    report.failed += 1;
                }
            }
        }
        info!(
            synced = report.synced,
            failed = report.failed,
            "scheduler synchronization finished"
        );
        Ok(report)
    }

    /// Start-up entry point: a total `sync_all` failure is retried exactly
    /// once after `retry_delay`; a second failure is surfaced via logs
    /// only, leaving the worker serving manually triggered jobs.
    pub async fn sync_all_with_retry(
        &self,
        retry_delay: Duration,
    ) -> Option<SyncReport> {
        match self.sync_all().await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(
                    error = %err,
                    retry_in_secs = retry_delay.as_secs(),
                    "scheduler synchronization failed, retrying once"
                );
                tokio::time::sleep(retry_delay).await;
                match self.sync_all().await {
                    Ok(report) => Some(report),
                    Err(err) => {
                        error!(
                            error = %err,
                            "scheduler synchronization failed twice; \
                             continuing with manual triggers only"
                        );
                        None
                    }
                }
            }
        }
    }

    /// Fires every due entry once and advances its next-fire time. A fire
    /// is skipped (not queued behind) while the entry's previous job is
    /// still waiting, delayed, or active. Returns the number of jobs
    /// enqueued.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize> {
        let entries = self.queue.list_schedulers().await?;
        let mut fired = 0;
        for entry in entries {
            if entry.next > now {
                continue;
            }
            match self.fire(entry, now).await {
                Ok(true) => fired += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(error = %err, "scheduler fire failed");
                }
            }
        }
        Ok(fired)
    }

    async fn fire(
        &self,
        mut entry: SchedulerEntry,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if let Some(last) = entry.last_job_id {
            let state = self
                .queue
                .job_state(QueueName::Maintenance, last)
                .await?;
            if state.is_some_and(|state| state.is_in_flight()) {
                debug!(
                    scheduler = %entry.scheduler_id,
                    "previous scan still in flight, skipping fire"
                );
                entry.next = next_fire(&entry.pattern, now)?;
                self.queue.upsert_scheduler(entry).await?;
                return Ok(false);
            }
        }

        let job_id = self
            .queue
            .enqueue_scan(ScanJobPayload {
                rule_id: entry.rule_id,
                manual_trigger: false,
            })
            .await?;
        info!(
            scheduler = %entry.scheduler_id,
            rule = %entry.rule_id,
            job = %job_id,
            "scheduled scan enqueued"
        );
        entry.last_job_id = Some(job_id);
        entry.next = next_fire(&entry.pattern, now)?;
        self.queue.upsert_scheduler(entry).await?;
        Ok(true)
    }

    /// Spawns the periodic tick loop; it runs until `shutdown` fires.
    pub fn spawn_tick_loop(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("scheduler loop shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        match scheduler.tick(Utc::now()).await {
                            Ok(0) => {}
                            Ok(fired) => {
                                debug!(fired, "scheduler fired due rules")
                            }
                            Err(err) => {
                                warn!(error = %err, "scheduler tick failed")
                            }
                        }
                    }
                }
            }
        })
    }
}
