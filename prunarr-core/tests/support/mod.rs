//! Shared in-memory doubles for the engine's integration tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use prunarr_core::error::{MaintenanceError, Result};
use prunarr_core::sources::MovieRecord;
use prunarr_core::store::MaintenanceStore;
use prunarr_model::{
    ActionType, Candidate, CandidateId, CandidateInit, CriteriaNode,
    DeletionLogEntry, GroupNode, GroupOperator, MaintenanceRule,
    MaintenanceScan, MediaType, ReviewStatus, RuleId, ScanId, ScanStatus,
};

/// Hand-rolled [`MaintenanceStore`] double backed by plain vectors, so
/// tests can assert on exactly what was written.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pub rules: Mutex<Vec<MaintenanceRule>>,
    pub scans: Mutex<Vec<MaintenanceScan>>,
    pub candidates: Mutex<Vec<Candidate>>,
    pub deletion_log: Mutex<Vec<DeletionLogEntry>>,
    /// Number of times `find_scheduled_enabled_rules` should fail before
    /// succeeding, for start-up retry coverage.
    pub scheduled_rule_failures: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(self, rule: MaintenanceRule) -> Self {
        self.rules.lock().unwrap().push(rule);
        self
    }

    pub fn with_candidate(self, candidate: Candidate) -> Self {
        self.candidates.lock().unwrap().push(candidate);
        self
    }

    pub fn scan_rows(&self) -> Vec<MaintenanceScan> {
        self.scans.lock().unwrap().clone()
    }

    pub fn candidate_rows(&self) -> Vec<Candidate> {
        self.candidates.lock().unwrap().clone()
    }

    pub fn audit_rows(&self) -> Vec<DeletionLogEntry> {
        self.deletion_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl MaintenanceStore for InMemoryStore {
    async fn find_rule(&self, id: RuleId) -> Result<Option<MaintenanceRule>> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| rule.id == id)
            .cloned())
    }

    async fn find_scheduled_enabled_rules(
        &self,
    ) -> Result<Vec<MaintenanceRule>> {
        let pending = self.scheduled_rule_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.scheduled_rule_failures
                .store(pending - 1, Ordering::SeqCst);
            return Err(MaintenanceError::Internal(
                "store unavailable".to_string(),
            ));
        }
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|rule| rule.is_scheduled())
            .cloned()
            .collect())
    }

    async fn update_rule_last_run(
        &self,
        id: RuleId,
        ts: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(rule) = self
            .rules
            .lock()
            .unwrap()
            .iter_mut()
            .find(|rule| rule.id == id)
        {
            rule.last_run_at = Some(ts);
        }
        Ok(())
    }

    async fn insert_rule(&self, rule: &MaintenanceRule) -> Result<()> {
        self.rules.lock().unwrap().push(rule.clone());
        Ok(())
    }

    async fn delete_rule(&self, id: RuleId) -> Result<()> {
        self.rules.lock().unwrap().retain(|rule| rule.id != id);
        Ok(())
    }

    async fn create_running_scan(
        &self,
        rule_id: RuleId,
    ) -> Result<MaintenanceScan> {
        let scan = MaintenanceScan {
            id: ScanId::new(),
            rule_id,
            status: ScanStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            items_scanned: 0,
            items_flagged: 0,
            error: None,
        };
        self.scans.lock().unwrap().push(scan.clone());
        Ok(scan)
    }

    async fn finish_scan(
        &self,
        id: ScanId,
        status: ScanStatus,
        items_scanned: i32,
        items_flagged: i32,
        error: Option<&str>,
    ) -> Result<()> {
        if let Some(scan) = self
            .scans
            .lock()
            .unwrap()
            .iter_mut()
            .find(|scan| scan.id == id)
        {
            scan.status = status;
            scan.completed_at = Some(Utc::now());
            scan.items_scanned = items_scanned;
            scan.items_flagged = items_flagged;
            scan.error = error.map(str::to_string);
        }
        Ok(())
    }

    async fn create_candidates(
        &self,
        scan_id: ScanId,
        candidates: &[CandidateInit],
    ) -> Result<u64> {
        let mut rows = self.candidates.lock().unwrap();
        for init in candidates {
            rows.push(Candidate {
                id: CandidateId::new(),
                scan_id,
                media_type: init.media_type,
                plex_rating_key: init.plex_rating_key.clone(),
                radarr_id: init.radarr_id,
                sonarr_id: init.sonarr_id,
                tmdb_id: init.tmdb_id,
                tvdb_id: init.tvdb_id,
                title: init.title.clone(),
                year: init.year,
                poster: init.poster.clone(),
                file_path: init.file_path.clone(),
                file_size: init.file_size,
                play_count: init.play_count,
                last_watched_at: init.last_watched_at,
                added_at: init.added_at,
                matched_rules: init.matched_rules.clone(),
                review_status: ReviewStatus::Pending,
                deletion_error: None,
                deleted_at: None,
            });
        }
        Ok(candidates.len() as u64)
    }

    async fn find_approved_candidates(
        &self,
        ids: &[CandidateId],
    ) -> Result<Vec<Candidate>> {
        let rows = self.candidates.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                rows.iter()
                    .find(|candidate| {
                        candidate.id == *id
                            && candidate.review_status
                                == ReviewStatus::Approved
                    })
                    .cloned()
            })
            .collect())
    }

    async fn set_review_status(
        &self,
        id: CandidateId,
        status: ReviewStatus,
    ) -> Result<()> {
        if let Some(candidate) = self
            .candidates
            .lock()
            .unwrap()
            .iter_mut()
            .find(|candidate| candidate.id == id)
        {
            candidate.review_status = status;
        }
        Ok(())
    }

    async fn mark_candidate_deleted(
        &self,
        id: CandidateId,
        deleted_at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(candidate) = self
            .candidates
            .lock()
            .unwrap()
            .iter_mut()
            .find(|candidate| candidate.id == id)
        {
            candidate.review_status = ReviewStatus::Deleted;
            candidate.deleted_at = Some(deleted_at);
            candidate.deletion_error = None;
        }
        Ok(())
    }

    async fn record_deletion_error(
        &self,
        id: CandidateId,
        message: &str,
    ) -> Result<()> {
        if let Some(candidate) = self
            .candidates
            .lock()
            .unwrap()
            .iter_mut()
            .find(|candidate| candidate.id == id)
        {
            candidate.deletion_error = Some(message.to_string());
        }
        Ok(())
    }

    async fn insert_deletion_log(
        &self,
        entry: &DeletionLogEntry,
    ) -> Result<()> {
        self.deletion_log.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Movie rule over library "1" with the given tree.
pub fn movie_rule(name: &str, conditions: Vec<CriteriaNode>) -> MaintenanceRule {
    movie_rule_with_operator(name, GroupOperator::And, conditions)
}

pub fn movie_rule_with_operator(
    name: &str,
    operator: GroupOperator,
    conditions: Vec<CriteriaNode>,
) -> MaintenanceRule {
    MaintenanceRule {
        id: RuleId::new(),
        name: name.to_string(),
        enabled: true,
        media_type: MediaType::Movie,
        criteria: GroupNode {
            id: "root".to_string(),
            operator,
            conditions,
            library_ids: vec!["1".to_string()],
        },
        schedule: None,
        action_type: ActionType::Delete,
        last_run_at: None,
        next_run_at: None,
        created_at: Utc::now(),
    }
}

/// Wire movie with watch/age attributes expressed relative to now.
pub fn wire_movie(
    id: i64,
    title: &str,
    play_count: i64,
    added_days_ago: i64,
    year: i32,
) -> MovieRecord {
    MovieRecord {
        id,
        title: title.to_string(),
        year: Some(year),
        plex_rating_key: Some(format!("plex-{id}")),
        added: Some((Utc::now() - Duration::days(added_days_ago)).timestamp()),
        play_count: Some(play_count),
        size_on_disk: Some(3 * 1024 * 1024 * 1024),
        path: Some(format!("/movies/{title}.mkv")),
        ..MovieRecord::default()
    }
}

/// Approved movie candidate ready for deletion tests.
pub fn approved_candidate(
    title: &str,
    radarr_id: Option<i64>,
) -> Candidate {
    Candidate {
        id: CandidateId::new(),
        scan_id: ScanId::new(),
        media_type: MediaType::Movie,
        plex_rating_key: format!("plex-{title}"),
        radarr_id,
        sonarr_id: None,
        tmdb_id: None,
        tvdb_id: None,
        title: title.to_string(),
        year: Some(2001),
        poster: None,
        file_path: Some(format!("/movies/{title}.mkv")),
        file_size: Some(2 * 1024 * 1024 * 1024),
        play_count: 0,
        last_watched_at: None,
        added_at: Some(Utc::now() - Duration::days(400)),
        matched_rules: vec!["Stale movies".to_string()],
        review_status: ReviewStatus::Approved,
        deletion_error: None,
        deleted_at: None,
    }
}
