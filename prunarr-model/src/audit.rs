use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::CandidateId;
use crate::media_type::MediaType;

/// One audit row per attempted deletion. Audit rows carry no foreign key to
/// candidates: they outlive the scans and candidates they describe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionLogEntry {
    pub id: Uuid,
    pub candidate_id: CandidateId,
    pub media_type: MediaType,
    pub title: String,
    pub year: Option<i32>,
    pub file_size: Option<i64>,
    /// Operator who approved and triggered the deletion.
    pub deleted_by: String,
    /// Instance name of the catalog service that performed the delete.
    pub deleted_from: String,
    pub files_deleted: bool,
    pub rule_names: Vec<String>,
    pub created_at: DateTime<Utc>,
}
