//! Scheduler semantics: sync upsert/remove, startup re-synchronization,
//! and tick firing against a recording queue double.

mod support;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use prunarr_core::error::Result;
use prunarr_core::queue::{
    DeletionJobPayload, JobId, JobQueue, JobState, QueueName, RuleScheduler,
    ScanJobPayload, SchedulerEntry,
};
use prunarr_model::RuleId;

use support::{InMemoryStore, movie_rule};

/// Hand-rolled queue double that records enqueues and serves configurable
/// job states.
#[derive(Debug, Default)]
struct RecordingQueue {
    schedulers: Mutex<HashMap<String, SchedulerEntry>>,
    scans: Mutex<Vec<(JobId, ScanJobPayload)>>,
    job_states: Mutex<HashMap<JobId, JobState>>,
}

impl RecordingQueue {
    fn entry(&self, scheduler_id: &str) -> Option<SchedulerEntry> {
        self.schedulers.lock().unwrap().get(scheduler_id).cloned()
    }

    fn scan_payloads(&self) -> Vec<(JobId, ScanJobPayload)> {
        self.scans.lock().unwrap().clone()
    }

    fn set_job_state(&self, id: JobId, state: JobState) {
        self.job_states.lock().unwrap().insert(id, state);
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue_scan(&self, payload: ScanJobPayload) -> Result<JobId> {
        let id = JobId::new();
        self.scans.lock().unwrap().push((id, payload));
        Ok(id)
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
        id: JobId,
    ) -> Result<Option<JobState>> {
        Ok(self.job_states.lock().unwrap().get(&id).copied())
    }

    async fn upsert_scheduler(&self, entry: SchedulerEntry) -> Result<()> {
        self.schedulers
            .lock()
            .unwrap()
            .insert(entry.scheduler_id.clone(), entry);
        Ok(())
    }

    async fn remove_scheduler(&self, scheduler_id: &str) -> Result<()> {
        self.schedulers.lock().unwrap().remove(scheduler_id);
        Ok(())
    }

    async fn list_schedulers(&self) -> Result<Vec<SchedulerEntry>> {
        let mut entries: Vec<SchedulerEntry> =
            self.schedulers.lock().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| a.scheduler_id.cmp(&b.scheduler_id));
        Ok(entries)
    }
}

fn scheduler_with(
    store: Arc<InMemoryStore>,
    queue: Arc<RecordingQueue>,
) -> RuleScheduler {
    RuleScheduler::new(store, queue)
}

#[tokio::test]
async fn sync_upserts_then_removes() {
    let queue = Arc::new(RecordingQueue::default());
    let scheduler =
        scheduler_with(Arc::new(InMemoryStore::new()), Arc::clone(&queue));
    let rule_id = RuleId::new();
    let scheduler_id = format!("maintenance-rule-{rule_id}");

    scheduler
        .sync(rule_id, Some("0 3 * * *"), true)
        .await
        .expect("sync enabled rule");

    let entry = queue.entry(&scheduler_id).expect("entry registered");
    assert_eq!(entry.rule_id, rule_id);
    assert_eq!(entry.pattern, "0 3 * * *");
    assert!(entry.next > Utc::now());
    assert_eq!(entry.last_job_id, None);

    scheduler
        .sync(rule_id, Some("0 3 * * *"), false)
        .await
        .expect("sync disabled rule");
    assert!(queue.entry(&scheduler_id).is_none());

    // Removal is idempotent.
    scheduler.remove(rule_id).await.expect("first remove");
    scheduler.remove(rule_id).await.expect("second remove");
}

#[tokio::test]
async fn sync_rejects_invalid_cron() {
    let queue = Arc::new(RecordingQueue::default());
    let scheduler =
        scheduler_with(Arc::new(InMemoryStore::new()), Arc::clone(&queue));
    let rule_id = RuleId::new();

    let result = scheduler.sync(rule_id, Some("not a cron"), true).await;
    assert!(result.is_err());
    assert!(queue
        .entry(&format!("maintenance-rule-{rule_id}"))
        .is_none());
}

#[tokio::test]
async fn sync_all_registers_every_valid_rule() {
    let mut good_daily = movie_rule("Daily", vec![]);
    good_daily.schedule = Some("0 3 * * *".to_string());
    let mut good_half_hourly = movie_rule("Half-hourly", vec![]);
    good_half_hourly.schedule = Some("*/30 * * * *".to_string());
    let mut broken = movie_rule("Broken", vec![]);
    broken.schedule = Some("bad cron".to_string());
    let mut manual_only = movie_rule("Manual", vec![]);
    manual_only.schedule = None;

    let store = Arc::new(
        InMemoryStore::new()
            .with_rule(good_daily.clone())
            .with_rule(good_half_hourly.clone())
            .with_rule(broken)
            .with_rule(manual_only),
    );
    let queue = Arc::new(RecordingQueue::default());
    let scheduler = scheduler_with(store, Arc::clone(&queue));

    let report = scheduler.sync_all().await.expect("sync_all");
    assert_eq!(report.synced, 2);
    assert_eq!(report.failed, 1);

    let active = scheduler.list_active().await.expect("list");
    assert_eq!(active.len(), 2);
    assert!(
        active
            .iter()
            .any(|entry| entry.rule_id == good_daily.id)
    );
    assert!(
        active
            .iter()
            .any(|entry| entry.rule_id == good_half_hourly.id)
    );
}

#[tokio::test]
async fn startup_sync_retries_once_after_a_total_failure() {
    let mut rule = movie_rule("Daily", vec![]);
    rule.schedule = Some("0 3 * * *".to_string());

    let store = Arc::new(InMemoryStore::new().with_rule(rule));
    store.scheduled_rule_failures.store(1, Ordering::SeqCst);
    let queue = Arc::new(RecordingQueue::default());
    let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&queue));

    let report = scheduler
        .sync_all_with_retry(Duration::from_millis(10))
        .await;
    assert_eq!(report.map(|r| r.synced), Some(1));

    // A second total failure gives up and leaves manual triggers working.
    store.scheduled_rule_failures.store(2, Ordering::SeqCst);
    let report = scheduler
        .sync_all_with_retry(Duration::from_millis(10))
        .await;
    assert!(report.is_none());
}

#[tokio::test]
async fn tick_fires_due_entries_and_advances_next() {
    let queue = Arc::new(RecordingQueue::default());
    let scheduler =
        scheduler_with(Arc::new(InMemoryStore::new()), Arc::clone(&queue));
    let rule_id = RuleId::new();
    let scheduler_id = format!("maintenance-rule-{rule_id}");

    queue
        .upsert_scheduler(SchedulerEntry {
            scheduler_id: scheduler_id.clone(),
            rule_id,
            pattern: "0 3 * * *".to_string(),
            next: Utc::now() - chrono::Duration::hours(1),
            last_job_id: None,
        })
        .await
        .expect("seed entry");

    let now = Utc::now();
    let fired = scheduler.tick(now).await.expect("tick");
    assert_eq!(fired, 1);

    let payloads = queue.scan_payloads();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].1.rule_id, rule_id);
    assert!(!payloads[0].1.manual_trigger);

    let entry = queue.entry(&scheduler_id).expect("entry kept");
    assert!(entry.next > now);
    assert_eq!(entry.last_job_id, Some(payloads[0].0));

    // Not due again: an immediate second tick fires nothing.
    assert_eq!(scheduler.tick(Utc::now()).await.expect("tick"), 0);
}

#[tokio::test]
async fn tick_skips_while_previous_scan_is_in_flight() {
    let queue = Arc::new(RecordingQueue::default());
    let scheduler =
        scheduler_with(Arc::new(InMemoryStore::new()), Arc::clone(&queue));
    let rule_id = RuleId::new();
    let scheduler_id = format!("maintenance-rule-{rule_id}");
    let previous_job = JobId::new();
    queue.set_job_state(previous_job, JobState::Active);

    queue
        .upsert_scheduler(SchedulerEntry {
            scheduler_id: scheduler_id.clone(),
            rule_id,
            pattern: "0 3 * * *".to_string(),
            next: Utc::now() - chrono::Duration::hours(1),
            last_job_id: Some(previous_job),
        })
        .await
        .expect("seed entry");

    let now = Utc::now();
    assert_eq!(scheduler.tick(now).await.expect("tick"), 0);
    assert!(queue.scan_payloads().is_empty());

    // The fire is skipped, not queued behind: next still advances.
    let entry = queue.entry(&scheduler_id).expect("entry kept");
    assert!(entry.next > now);

    // Once the previous run finishes, the next due tick fires again.
    queue.set_job_state(previous_job, JobState::Completed);
    queue
        .upsert_scheduler(SchedulerEntry {
            next: Utc::now() - chrono::Duration::minutes(5),
            ..entry
        })
        .await
        .expect("re-seed entry");
    assert_eq!(scheduler.tick(Utc::now()).await.expect("tick"), 1);
    assert_eq!(queue.scan_payloads().len(), 1);
}
