use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CandidateId, ScanId};
use crate::media_type::MediaType;

/// Review state of a flagged candidate.
///
/// `Pending` may move to `Approved` or `Rejected`; `Approved` moves to
/// `Deleted` once the executor succeeds (a failed delete leaves the row
/// `Approved` with `deletion_error` set). `Rejected` and `Deleted` are
/// terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Deleted,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "PENDING",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Rejected => "REJECTED",
            ReviewStatus::Deleted => "DELETED",
        }
    }

    pub fn decode(value: &str) -> Option<ReviewStatus> {
        match value {
            "PENDING" => Some(ReviewStatus::Pending),
            "APPROVED" => Some(ReviewStatus::Approved),
            "REJECTED" => Some(ReviewStatus::Rejected),
            "DELETED" => Some(ReviewStatus::Deleted),
            _ => None,
        }
    }
}

/// An item the evaluator flagged during a scan, awaiting operator review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: CandidateId,
    pub scan_id: ScanId,
    pub media_type: MediaType,
    pub plex_rating_key: String,
    pub radarr_id: Option<i64>,
    pub sonarr_id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub tvdb_id: Option<i64>,
    pub title: String,
    pub year: Option<i32>,
    pub poster: Option<String>,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub play_count: i64,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub added_at: Option<DateTime<Utc>>,
    pub matched_rules: Vec<String>,
    pub review_status: ReviewStatus,
    pub deletion_error: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Candidate {
    /// External catalog-service id required to execute a deletion.
    pub fn external_id(&self) -> Option<i64> {
        match self.media_type {
            MediaType::Movie => self.radarr_id,
            MediaType::TvSeries => self.sonarr_id,
        }
    }
}

/// Insertion payload for a freshly flagged candidate. The store assigns the
/// id and initializes `review_status` to `Pending`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInit {
    pub media_type: MediaType,
    pub plex_rating_key: String,
    pub radarr_id: Option<i64>,
    pub sonarr_id: Option<i64>,
    pub tmdb_id: Option<i64>,
    pub tvdb_id: Option<i64>,
    pub title: String,
    pub year: Option<i32>,
    pub poster: Option<String>,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub play_count: i64,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub added_at: Option<DateTime<Utc>>,
    pub matched_rules: Vec<String>,
}
