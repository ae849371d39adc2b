use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prunarr_model::{
    ActionType, Candidate, CandidateId, CandidateInit, CriteriaNode,
    DeletionLogEntry, GroupNode, MaintenanceRule, MaintenanceScan, MediaType,
    ReviewStatus, RuleId, ScanId, ScanStatus,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::MaintenanceStore;
use crate::error::{MaintenanceError, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Postgres-backed [`MaintenanceStore`].
#[derive(Clone, Debug)]
pub struct PostgresMaintenanceStore {
    pool: PgPool,
}

impl PostgresMaintenanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| MaintenanceError::Internal(format!("migration failed: {e}")))
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn decode_media_type(value: &str) -> Result<MediaType> {
        MediaType::decode(value).ok_or_else(|| {
            MaintenanceError::Internal(format!("unknown media type '{value}'"))
        })
    }

    fn rule_from_row(row: &PgRow) -> Result<MaintenanceRule> {
        let media_type: String = row.try_get("media_type")?;
        let action_type: String = row.try_get("action_type")?;
        let criteria: serde_json::Value = row.try_get("criteria")?;

        Ok(MaintenanceRule {
            id: RuleId(row.try_get("id")?),
            name: row.try_get("name")?,
            enabled: row.try_get("enabled")?,
            media_type: Self::decode_media_type(&media_type)?,
            criteria: GroupNode::from_value(criteria)?,
            schedule: row.try_get("schedule")?,
            action_type: ActionType::decode(&action_type).ok_or_else(|| {
                MaintenanceError::Internal(format!(
                    "unknown action type '{action_type}'"
                ))
            })?,
            last_run_at: row.try_get("last_run_at")?,
            next_run_at: row.try_get("next_run_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn candidate_from_row(row: &PgRow) -> Result<Candidate> {
        let media_type: String = row.try_get("media_type")?;
        let review_status: String = row.try_get("review_status")?;

        Ok(Candidate {
            id: CandidateId(row.try_get("id")?),
            scan_id: ScanId(row.try_get("scan_id")?),
            media_type: Self::decode_media_type(&media_type)?,
            plex_rating_key: row.try_get("plex_rating_key")?,
            radarr_id: row.try_get("radarr_id")?,
            sonarr_id: row.try_get("sonarr_id")?,
            tmdb_id: row.try_get("tmdb_id")?,
            tvdb_id: row.try_get("tvdb_id")?,
            title: row.try_get("title")?,
            year: row.try_get("year")?,
            poster: row.try_get("poster")?,
            file_path: row.try_get("file_path")?,
            file_size: row.try_get("file_size")?,
            play_count: row.try_get("play_count")?,
            last_watched_at: row.try_get("last_watched_at")?,
            added_at: row.try_get("added_at")?,
            matched_rules: row.try_get("matched_rules")?,
            review_status: ReviewStatus::decode(&review_status).ok_or_else(
                || {
                    MaintenanceError::Internal(format!(
                        "unknown review status '{review_status}'"
                    ))
                },
            )?,
            deletion_error: row.try_get("deletion_error")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }
}

const RULE_COLUMNS: &str = "id, name, enabled, media_type, criteria, \
     schedule, action_type, last_run_at, next_run_at, created_at";

const CANDIDATE_COLUMNS: &str = "id, scan_id, media_type, plex_rating_key, \
     radarr_id, sonarr_id, tmdb_id, tvdb_id, title, year, poster, \
     file_path, file_size, play_count, last_watched_at, added_at, \
     matched_rules, review_status, deletion_error, deleted_at";

#[async_trait]
impl MaintenanceStore for PostgresMaintenanceStore {
    async fn find_rule(&self, id: RuleId) -> Result<Option<MaintenanceRule>> {
        let row = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM maintenance_rules WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(Self::rule_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_scheduled_enabled_rules(
        &self,
    ) -> Result<Vec<MaintenanceRule>> {
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM maintenance_rules \
             WHERE enabled = TRUE AND schedule IS NOT NULL \
             ORDER BY created_at"
        ))
        .fetch_all(self.pool())
        .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            rules.push(Self::rule_from_row(&row)?);
        }
        Ok(rules)
    }

    async fn update_rule_last_run(
        &self,
        id: RuleId,
        ts: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE maintenance_rules SET last_run_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(ts)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn insert_rule(&self, rule: &MaintenanceRule) -> Result<()> {
        let criteria =
            serde_json::to_value(CriteriaNode::Group(rule.criteria.clone()))?;
        sqlx::query(
            "INSERT INTO maintenance_rules \
             (id, name, enabled, media_type, criteria, schedule, \
              action_type, last_run_at, next_run_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(rule.id.as_uuid())
        .bind(&rule.name)
        .bind(rule.enabled)
        .bind(rule.media_type.as_str())
        .bind(criteria)
        .bind(&rule.schedule)
        .bind(rule.action_type.as_str())
        .bind(rule.last_run_at)
        .bind(rule.next_run_at)
        .bind(rule.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn delete_rule(&self, id: RuleId) -> Result<()> {
        sqlx::query("DELETE FROM maintenance_rules WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await?;
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

        sqlx::query(
            "INSERT INTO maintenance_scans \
             (id, rule_id, status, started_at, items_scanned, items_flagged) \
             VALUES ($1, $2, $3, $4, 0, 0)",
        )
        .bind(scan.id.as_uuid())
        .bind(scan.rule_id.as_uuid())
        .bind(scan.status.as_str())
        .bind(scan.started_at)
        .execute(self.pool())
        .await?;

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
        sqlx::query(
            "UPDATE maintenance_scans \
             SET status = $2, completed_at = $3, items_scanned = $4, \
                 items_flagged = $5, error = $6 \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(items_scanned)
        .bind(items_flagged)
        .bind(error)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn create_candidates(
        &self,
        scan_id: ScanId,
        candidates: &[CandidateInit],
    ) -> Result<u64> {
        let mut tx = self.pool().begin().await?;
        for init in candidates {
            sqlx::query(
                "INSERT INTO maintenance_candidates \
                 (id, scan_id, media_type, plex_rating_key, radarr_id, \
                  sonarr_id, tmdb_id, tvdb_id, title, year, poster, \
                  file_path, file_size, play_count, last_watched_at, \
                  added_at, matched_rules, review_status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, \
                         $12, $13, $14, $15, $16, $17, $18)",
            )
            .bind(CandidateId::new().as_uuid())
            .bind(scan_id.as_uuid())
            .bind(init.media_type.as_str())
            .bind(&init.plex_rating_key)
            .bind(init.radarr_id)
            .bind(init.sonarr_id)
            .bind(init.tmdb_id)
            .bind(init.tvdb_id)
            .bind(&init.title)
            .bind(init.year)
            .bind(&init.poster)
            .bind(&init.file_path)
            .bind(init.file_size)
            .bind(init.play_count)
            .bind(init.last_watched_at)
            .bind(init.added_at)
            .bind(init.matched_rules.clone())
            .bind(ReviewStatus::Pending.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(candidates.len() as u64)
    }

    async fn find_approved_candidates(
        &self,
        ids: &[CandidateId],
    ) -> Result<Vec<Candidate>> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM maintenance_candidates \
             WHERE id = ANY($1) AND review_status = $2 \
             ORDER BY array_position($1, id)"
        ))
        .bind(uuids)
        .bind(ReviewStatus::Approved.as_str())
        .fetch_all(self.pool())
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for row in rows {
            candidates.push(Self::candidate_from_row(&row)?);
        }
        Ok(candidates)
    }

    async fn set_review_status(
        &self,
        id: CandidateId,
        status: ReviewStatus,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE maintenance_candidates SET review_status = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn mark_candidate_deleted(
        &self,
        id: CandidateId,
        deleted_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE maintenance_candidates \
             SET review_status = $2, deleted_at = $3, deletion_error = NULL \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(ReviewStatus::Deleted.as_str())
        .bind(deleted_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn record_deletion_error(
        &self,
        id: CandidateId,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE maintenance_candidates SET deletion_error = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(message)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn insert_deletion_log(
        &self,
        entry: &DeletionLogEntry,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO maintenance_deletion_log \
             (id, candidate_id, media_type, title, year, file_size, \
              deleted_by, deleted_from, files_deleted, rule_names, \
              created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(entry.id)
        .bind(entry.candidate_id.as_uuid())
        .bind(entry.media_type.as_str())
        .bind(&entry.title)
        .bind(entry.year)
        .bind(entry.file_size)
        .bind(&entry.deleted_by)
        .bind(&entry.deleted_from)
        .bind(entry.files_deleted)
        .bind(entry.rule_names.clone())
        .bind(entry.created_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
