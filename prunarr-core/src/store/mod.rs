//! Persistence gateway over the relational store.
//!
//! Every operation returns a structured [`crate::error::MaintenanceError`]
//! instead of raising across the boundary; callers decide whether a store
//! failure fails a scan, a candidate, or a whole job.

mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prunarr_model::{
    Candidate, CandidateId, CandidateInit, DeletionLogEntry, MaintenanceRule,
    MaintenanceScan, ReviewStatus, RuleId, ScanId, ScanStatus,
};

use crate::error::Result;

pub use postgres::PostgresMaintenanceStore;

#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    // Rules
    async fn find_rule(&self, id: RuleId) -> Result<Option<MaintenanceRule>>;

    /// Enabled rules carrying a cron schedule, for scheduler start-up
    /// re-synchronization.
    async fn find_scheduled_enabled_rules(&self)
    -> Result<Vec<MaintenanceRule>>;

    async fn update_rule_last_run(
        &self,
        id: RuleId,
        ts: DateTime<Utc>,
    ) -> Result<()>;

    async fn insert_rule(&self, rule: &MaintenanceRule) -> Result<()>;

    /// Removes a rule; its scans and their candidates cascade.
    async fn delete_rule(&self, id: RuleId) -> Result<()>;

    // Scans
    async fn create_running_scan(
        &self,
        rule_id: RuleId,
    ) -> Result<MaintenanceScan>;

    async fn finish_scan(
        &self,
        id: ScanId,
        status: ScanStatus,
        items_scanned: i32,
        items_flagged: i32,
        error: Option<&str>,
    ) -> Result<()>;

    // Candidates
    /// Inserts all candidates of one scan in a single transaction, in the
    /// given order. Returns the number of rows written.
    async fn create_candidates(
        &self,
        scan_id: ScanId,
        candidates: &[CandidateInit],
    ) -> Result<u64>;

    /// Loads the subset of `ids` currently in `APPROVED`, preserving the
    /// order of `ids`.
    async fn find_approved_candidates(
        &self,
        ids: &[CandidateId],
    ) -> Result<Vec<Candidate>>;

    async fn set_review_status(
        &self,
        id: CandidateId,
        status: ReviewStatus,
    ) -> Result<()>;

    async fn mark_candidate_deleted(
        &self,
        id: CandidateId,
        deleted_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn record_deletion_error(
        &self,
        id: CandidateId,
        message: &str,
    ) -> Result<()>;

    // Audit
    async fn insert_deletion_log(&self, entry: &DeletionLogEntry)
    -> Result<()>;
}
