//! Deletion executor: turns approved candidates into catalog-service
//! deletes with one audit row per success.
//!
//! Invocations are serialized by the deletion worker's concurrency of 1;
//! within a batch, each candidate's transition is its own unit of work, so
//! a failure mid-batch leaves earlier candidates deleted and audited.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use prunarr_model::{Candidate, CandidateId, DeletionLogEntry, MediaType};
use tracing::{info, warn};
use uuid::Uuid;

use crate::scan::ProgressFn;
use crate::sources::SourceSet;
use crate::store::MaintenanceStore;

/// Aggregate result of one deletion batch. Errors are human-readable
/// `"{title}: {message}"` strings for direct presentation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub success: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl DeletionReport {
    /// Number of candidates that reached the per-candidate stage.
    pub fn processed(&self) -> u32 {
        self.success + self.failed
    }
}

pub struct DeletionExecutor {
    store: Arc<dyn MaintenanceStore>,
    sources: SourceSet,
}

impl fmt::Debug for DeletionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionExecutor")
            .field("sources", &self.sources)
            .finish()
    }
}

impl DeletionExecutor {
    pub fn new(store: Arc<dyn MaintenanceStore>, sources: SourceSet) -> Self {
        Self { store, sources }
    }

    /// Executes deletions for the approved subset of `candidate_ids`, in
    /// order. Candidates not in `APPROVED` are silently skipped and count
    /// toward neither `success` nor `failed`. Never returns an error:
    /// failures are captured per candidate or in `errors`.
    pub async fn execute(
        &self,
        candidate_ids: &[CandidateId],
        delete_files: bool,
        user_id: &str,
        on_progress: Option<ProgressFn<'_>>,
    ) -> DeletionReport {
        let mut report = DeletionReport::default();

        let candidates = match self
            .store
            .find_approved_candidates(candidate_ids)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "failed to load approved candidates");
                report
                    .errors
                    .push(format!("Failed to load candidates: {err}"));
                return report;
            }
        };

        let total = candidates.len();
        for (index, candidate) in candidates.iter().enumerate() {
            match self
                .delete_candidate(candidate, delete_files, user_id)
                .await
            {
                Ok(()) => report.success += 1,
                Err(message) => {
                    if let Err(err) = self
                        .store
                        .record_deletion_error(candidate.id, &message)
                        .await
                    {
                        warn!(
                            candidate = %candidate.id,
                            error = %err,
                            "failed to record deletion error"
                        );
                    }
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("{}: {}", candidate.title, message));
                }
            }

            if let Some(report_progress) = on_progress {
                report_progress(((index + 1) * 100 / total) as u8);
            }
        }

        info!(
            requested = candidate_ids.len(),
            success = report.success,
            failed = report.failed,
            "deletion batch finished"
        );
        report
    }

    async fn delete_candidate(
        &self,
        candidate: &Candidate,
        delete_files: bool,
        user_id: &str,
    ) -> std::result::Result<(), String> {
        let source = self.sources.get(candidate.media_type).ok_or_else(|| {
            format!(
                "No active {} instance configured",
                SourceSet::service_label(candidate.media_type)
            )
        })?;

        let external_id = candidate.external_id().ok_or_else(|| {
            match candidate.media_type {
                MediaType::Movie => "Missing Radarr id for movie",
                MediaType::TvSeries => "Missing Sonarr id for series",
            }
            .to_string()
        })?;

        source
            .delete_media(external_id, delete_files)
            .await
            .map_err(|err| err.to_string())?;

        let now = Utc::now();
        self.store
            .mark_candidate_deleted(candidate.id, now)
            .await
            .map_err(|err| {
                format!("deleted upstream but failed to update candidate: {err}")
            })?;

        let entry = DeletionLogEntry {
            id: Uuid::now_v7(),
            candidate_id: candidate.id,
            media_type: candidate.media_type,
            title: candidate.title.clone(),
            year: candidate.year,
            file_size: candidate.file_size,
            deleted_by: user_id.to_string(),
            deleted_from: source.instance_name().to_string(),
            files_deleted: delete_files,
            rule_names: candidate.matched_rules.clone(),
            created_at: now,
        };
        if let Err(err) = self.store.insert_deletion_log(&entry).await {
            // The candidate is already gone upstream; keep the success but
            // surface the audit gap loudly.
            warn!(
                candidate = %candidate.id,
                error = %err,
                "failed to write deletion audit row"
            );
        }

        Ok(())
    }
}
