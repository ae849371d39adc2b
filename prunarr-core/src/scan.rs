//! Scan orchestrator: drives registry, evaluator, and media sources to
//! turn one rule into durable candidate rows.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use prunarr_model::{
    CandidateInit, MaintenanceRule, MediaItem, RuleId, ScanId, ScanStatus,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::MaintenanceError;
use crate::eval::{EvalContext, evaluate};
use crate::sources::{LIBRARY_PAGE_LIMIT, LibraryRef, MediaSource, SourceSet};
use crate::store::MaintenanceStore;

/// Progress is reported every this many evaluated items.
pub const PROGRESS_REPORT_INTERVAL: usize = 10;

/// Non-blocking progress sink; receives a percent in `0..=100`, monotonic
/// non-decreasing.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Structured result of one scan. The public entry never returns an `Err`:
/// every failure lands here with a human-readable message.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanOutcome {
    pub scan_id: Option<ScanId>,
    pub status: ScanStatus,
    pub items_scanned: i32,
    pub items_flagged: i32,
    pub error: Option<String>,
    /// Whether a queue worker should re-raise so the job is retried.
    pub retryable: bool,
}

impl ScanOutcome {
    fn completed(scan_id: ScanId, items_scanned: i32, items_flagged: i32) -> Self {
        Self {
            scan_id: Some(scan_id),
            status: ScanStatus::Completed,
            items_scanned,
            items_flagged,
            error: None,
            retryable: false,
        }
    }

    fn failed(
        scan_id: Option<ScanId>,
        items_scanned: i32,
        items_flagged: i32,
        error: &MaintenanceError,
    ) -> Self {
        Self {
            scan_id,
            status: ScanStatus::Failed,
            items_scanned,
            items_flagged,
            error: Some(failure_message(error)),
            retryable: error.is_retryable(),
        }
    }
}

fn failure_message(error: &MaintenanceError) -> String {
    match error {
        MaintenanceError::Cancelled => "cancelled".to_string(),
        other => other.to_string(),
    }
}

type RunError = (i32, i32, MaintenanceError);

/// Orchestrates scans; owns the scan-record lifecycle.
pub struct MaintenanceScanner {
    store: Arc<dyn MaintenanceStore>,
    sources: SourceSet,
}

impl fmt::Debug for MaintenanceScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaintenanceScanner")
            .field("sources", &self.sources)
            .finish()
    }
}

impl MaintenanceScanner {
    pub fn new(store: Arc<dyn MaintenanceStore>, sources: SourceSet) -> Self {
        Self { store, sources }
    }

    /// Runs one scan for `rule_id`.
    ///
    /// Rule lookup and the enabled gate happen before a scan row exists;
    /// every later failure is recorded on the row, which transitions
    /// exactly once to `COMPLETED` or `FAILED`. Cancellation is observed
    /// between items and finalizes the row as `FAILED`/`cancelled`.
    pub async fn scan(
        &self,
        rule_id: RuleId,
        cancel: &CancellationToken,
        on_progress: Option<ProgressFn<'_>>,
    ) -> ScanOutcome {
        let rule = match self.store.find_rule(rule_id).await {
            Ok(Some(rule)) => rule,
            Ok(None) => {
                return ScanOutcome::failed(
                    None,
                    0,
                    0,
                    &MaintenanceError::RuleNotFound(rule_id),
                );
            }
            Err(err) => return ScanOutcome::failed(None, 0, 0, &err),
        };

        if !rule.enabled {
            return ScanOutcome::failed(
                None,
                0,
                0,
                &MaintenanceError::RuleDisabled {
                    id: rule.id,
                    name: rule.name,
                },
            );
        }

        let scan = match self.store.create_running_scan(rule.id).await {
            Ok(scan) => scan,
            Err(err) => return ScanOutcome::failed(None, 0, 0, &err),
        };

        match self.run(&rule, scan.id, cancel, on_progress).await {
            Ok((items_scanned, items_flagged)) => {
                if let Err(err) = self
                    .store
                    .finish_scan(
                        scan.id,
                        ScanStatus::Completed,
                        items_scanned,
                        items_flagged,
                        None,
                    )
                    .await
                {
                    warn!(scan = %scan.id, error = %err, "failed to finalize scan row");
                }
                if let Err(err) = self
                    .store
                    .update_rule_last_run(rule.id, Utc::now())
                    .await
                {
                    warn!(rule = %rule.id, error = %err, "failed to update rule last-run timestamp");
                }
                info!(
                    rule = %rule.id,
                    scan = %scan.id,
                    items_scanned,
                    items_flagged,
                    "scan completed"
                );
                ScanOutcome::completed(scan.id, items_scanned, items_flagged)
            }
            Err((items_scanned, items_flagged, err)) => {
                let message = failure_message(&err);
                if let Err(finish_err) = self
                    .store
                    .finish_scan(
                        scan.id,
                        ScanStatus::Failed,
                        items_scanned,
                        items_flagged,
                        Some(&message),
                    )
                    .await
                {
                    warn!(scan = %scan.id, error = %finish_err, "failed to finalize failed scan row");
                }
                warn!(rule = %rule.id, scan = %scan.id, error = %message, "scan failed");
                ScanOutcome::failed(
                    Some(scan.id),
                    items_scanned,
                    items_flagged,
                    &err,
                )
            }
        }
    }

    async fn run(
        &self,
        rule: &MaintenanceRule,
        scan_id: ScanId,
        cancel: &CancellationToken,
        on_progress: Option<ProgressFn<'_>>,
    ) -> std::result::Result<(i32, i32), RunError> {
        if rule.criteria.library_ids.is_empty() {
            return Err((
                0,
                0,
                MaintenanceError::RuleInvalid(format!(
                    "Rule '{}' ({}) has no libraries selected",
                    rule.name, rule.id
                )),
            ));
        }

        let source = self.sources.get(rule.media_type).ok_or_else(|| {
            (
                0,
                0,
                MaintenanceError::UpstreamUnavailable(format!(
                    "No active {} instance configured",
                    SourceSet::service_label(rule.media_type)
                )),
            )
        })?;

        let libraries = source
            .list_libraries()
            .await
            .map_err(|err| (0, 0, err))?;

        // A failed library fetch fails the whole scan.
        let mut items: Vec<MediaItem> = Vec::new();
        for library_id in &rule.criteria.library_ids {
            let library = libraries
                .iter()
                .find(|library| &library.id == library_id)
                .cloned()
                .unwrap_or_else(|| LibraryRef {
                    id: library_id.clone(),
                    name: library_id.clone(),
                });
            let page = source
                .fetch_items(&library, LIBRARY_PAGE_LIMIT)
                .await
                .map_err(|err| (0, 0, err))?;
            items.extend(page);
        }

        let total = items.len();
        let ctx = EvalContext::new();
        let mut flagged: Vec<CandidateInit> = Vec::new();
        let mut scanned = 0usize;

        for item in &items {
            if cancel.is_cancelled() {
                return Err((
                    scanned as i32,
                    flagged.len() as i32,
                    MaintenanceError::Cancelled,
                ));
            }

            if evaluate(item, &rule.criteria, &ctx) {
                flagged.push(candidate_init(rule, source.as_ref(), item));
            }
            scanned += 1;

            if scanned % PROGRESS_REPORT_INTERVAL == 0 || scanned == total {
                if let Some(report) = on_progress {
                    report(percent(scanned, total));
                }
            }
        }

        self.store
            .create_candidates(scan_id, &flagged)
            .await
            .map_err(|err| (scanned as i32, flagged.len() as i32, err))?;

        Ok((scanned as i32, flagged.len() as i32))
    }
}

fn percent(scanned: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        (scanned * 100 / total) as u8
    }
}

fn candidate_init(
    rule: &MaintenanceRule,
    source: &dyn MediaSource,
    item: &MediaItem,
) -> CandidateInit {
    let plex_rating_key = item
        .plex_rating_key
        .clone()
        .or_else(|| {
            item.external_id(rule.media_type)
                .map(|id| format!("{}_{}", source.source_key(), id))
        })
        .unwrap_or_else(|| {
            // Last-resort key; the random suffix keeps it unique within
            // the scan.
            format!(
                "unknown_{}_{}",
                Utc::now().timestamp_millis(),
                random_suffix()
            )
        });

    CandidateInit {
        media_type: rule.media_type,
        plex_rating_key,
        radarr_id: item.radarr_id,
        sonarr_id: item.sonarr_id,
        tmdb_id: item.tmdb_id,
        tvdb_id: item.tvdb_id,
        title: item.title.clone(),
        year: item.year,
        poster: item.poster.clone(),
        file_path: item.file_path.clone(),
        file_size: item.file_size,
        play_count: item.play_count,
        last_watched_at: item.last_watched_at,
        added_at: item.added_at,
        matched_rules: vec![rule.name.clone()],
    }
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(4)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_bounded_and_floored() {
        assert_eq!(percent(0, 25), 0);
        assert_eq!(percent(10, 25), 40);
        assert_eq!(percent(24, 25), 96);
        assert_eq!(percent(25, 25), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
