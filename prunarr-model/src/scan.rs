use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RuleId, ScanId};

/// Lifecycle of one orchestrator invocation. A scan row is created
/// `Running` and transitions exactly once to `Completed` or `Failed`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Running => "RUNNING",
            ScanStatus::Completed => "COMPLETED",
            ScanStatus::Failed => "FAILED",
        }
    }

    pub fn decode(value: &str) -> Option<ScanStatus> {
        match value {
            "RUNNING" => Some(ScanStatus::Running),
            "COMPLETED" => Some(ScanStatus::Completed),
            "FAILED" => Some(ScanStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanStatus::Running)
    }
}

/// Durable record of one scan of one rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceScan {
    pub id: ScanId,
    pub rule_id: RuleId,
    pub status: ScanStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items_scanned: i32,
    pub items_flagged: i32,
    pub error: Option<String>,
}
