//! Deletion executor behaviour: approved-only processing, per-candidate
//! failure capture, audit rows, and progress.

mod support;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use prunarr_core::deletion::DeletionExecutor;
use prunarr_core::error::{MaintenanceError, Result};
use prunarr_core::sources::{
    LibraryRef, MovieManagerApi, MovieRecord, MovieSource, SourceSet,
};
use prunarr_model::ReviewStatus;

use support::{InMemoryStore, approved_candidate};

mock! {
    pub MovieApi {}

    #[async_trait]
    impl MovieManagerApi for MovieApi {
        async fn list_libraries(&self) -> Result<Vec<LibraryRef>>;
        async fn fetch_library_page(
            &self,
            library_id: &str,
            limit: usize,
        ) -> Result<Vec<MovieRecord>>;
        async fn delete_movie(
            &self,
            movie_id: i64,
            delete_files: bool,
        ) -> Result<()>;
    }
}

fn executor_with(
    store: Arc<InMemoryStore>,
    api: MockMovieApi,
) -> DeletionExecutor {
    let source = Arc::new(MovieSource::new(Arc::new(api), "radarr-main"));
    DeletionExecutor::new(store, SourceSet::default().with_movies(source))
}

#[tokio::test]
async fn non_approved_candidates_are_silently_skipped() {
    let mut pending = approved_candidate("Still Pending", Some(101));
    pending.review_status = ReviewStatus::Pending;
    let pending_id = pending.id;
    let store = Arc::new(InMemoryStore::new().with_candidate(pending));

    let executor = executor_with(Arc::clone(&store), MockMovieApi::new());
    let report = executor.execute(&[pending_id], true, "admin", None).await;

    assert_eq!(report.success, 0);
    assert_eq!(report.failed, 0);
    assert!(report.errors.is_empty());

    let rows = store.candidate_rows();
    assert_eq!(rows[0].review_status, ReviewStatus::Pending);
    assert!(store.audit_rows().is_empty());
}

#[tokio::test]
async fn partial_failure_reports_both_sides() {
    let first = approved_candidate("First Out", Some(101));
    let second = approved_candidate("Second Stays", Some(202));
    let (first_id, second_id) = (first.id, second.id);
    let store = Arc::new(
        InMemoryStore::new()
            .with_candidate(first)
            .with_candidate(second),
    );

    let mut api = MockMovieApi::new();
    api.expect_delete_movie().returning(|movie_id, _| {
        if movie_id == 202 {
            Err(MaintenanceError::UpstreamUnavailable(
                "disk error".to_string(),
            ))
        } else {
            Ok(())
        }
    });

    let executor = executor_with(Arc::clone(&store), api);
    let report = executor
        .execute(&[first_id, second_id], true, "admin", None)
        .await;

    assert_eq!(report.success, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Second Stays: "));
    assert!(report.errors[0].contains("disk error"));

    let rows = store.candidate_rows();
    let first_row = rows.iter().find(|c| c.id == first_id).unwrap();
    assert_eq!(first_row.review_status, ReviewStatus::Deleted);
    assert!(first_row.deleted_at.is_some());
    assert_eq!(first_row.deletion_error, None);

    let second_row = rows.iter().find(|c| c.id == second_id).unwrap();
    assert_eq!(second_row.review_status, ReviewStatus::Approved);
    assert!(
        second_row
            .deletion_error
            .as_deref()
            .is_some_and(|e| e.contains("disk error"))
    );

    let audit = store.audit_rows();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].candidate_id, first_id);
    assert_eq!(audit[0].deleted_by, "admin");
    assert_eq!(audit[0].deleted_from, "radarr-main");
    assert!(audit[0].files_deleted);
    assert_eq!(audit[0].rule_names, vec!["Stale movies"]);
}

#[tokio::test]
async fn missing_external_id_fails_the_candidate() {
    let candidate = approved_candidate("No Manager Id", None);
    let candidate_id = candidate.id;
    let store = Arc::new(InMemoryStore::new().with_candidate(candidate));

    // No delete expectation: reaching the manager would panic the test.
    let executor = executor_with(Arc::clone(&store), MockMovieApi::new());
    let report = executor
        .execute(&[candidate_id], false, "admin", None)
        .await;

    assert_eq!(report.success, 0);
    assert_eq!(report.failed, 1);
    assert!(report.errors[0].contains("Missing Radarr id"));

    let rows = store.candidate_rows();
    assert_eq!(rows[0].review_status, ReviewStatus::Approved);
    assert!(rows[0].deletion_error.is_some());
}

#[tokio::test]
async fn unconfigured_service_fails_the_candidate() {
    let candidate = approved_candidate("Orphaned", Some(101));
    let candidate_id = candidate.id;
    let store = Arc::new(InMemoryStore::new().with_candidate(candidate));

    let executor = DeletionExecutor::new(
        Arc::clone(&store) as Arc<dyn prunarr_core::store::MaintenanceStore>,
        SourceSet::default(),
    );
    let report = executor
        .execute(&[candidate_id], true, "admin", None)
        .await;

    assert_eq!(report.failed, 1);
    assert!(
        report.errors[0].contains("No active Radarr instance configured")
    );
    assert!(store.audit_rows().is_empty());
}

#[tokio::test]
async fn progress_is_emitted_per_candidate() {
    let first = approved_candidate("One", Some(1));
    let second = approved_candidate("Two", Some(2));
    let ids = [first.id, second.id];
    let store = Arc::new(
        InMemoryStore::new()
            .with_candidate(first)
            .with_candidate(second),
    );

    let mut api = MockMovieApi::new();
    api.expect_delete_movie().returning(|_, _| Ok(()));

    let percents: Mutex<Vec<u8>> = Mutex::new(Vec::new());
    let record = |pct: u8| percents.lock().unwrap().push(pct);

    let executor = executor_with(Arc::clone(&store), api);
    let report = executor.execute(&ids, false, "admin", Some(&record)).await;

    assert_eq!(report.success, 2);
    assert_eq!(percents.into_inner().unwrap(), vec![50, 100]);

    // deleteFiles=false is recorded as-is on the audit rows.
    assert!(store.audit_rows().iter().all(|entry| !entry.files_deleted));
}
