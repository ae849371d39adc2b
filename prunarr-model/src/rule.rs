use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RuleId;
use crate::media_type::MediaType;
use crate::predicate::GroupNode;

/// What happens to candidates an operator approves.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Approved candidates are deleted from the owning catalog service.
    Delete,
    /// Candidates are surfaced for review only; nothing is executed.
    FlagOnly,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Delete => "DELETE",
            ActionType::FlagOnly => "FLAG_ONLY",
        }
    }

    pub fn decode(value: &str) -> Option<ActionType> {
        match value {
            "DELETE" => Some(ActionType::Delete),
            "FLAG_ONLY" => Some(ActionType::FlagOnly),
            _ => None,
        }
    }
}

/// Administrator-defined maintenance rule: a predicate tree plus metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRule {
    pub id: RuleId,
    pub name: String,
    pub enabled: bool,
    pub media_type: MediaType,
    pub criteria: GroupNode,
    /// Standard 5-field cron expression; `None` means manual-only.
    pub schedule: Option<String>,
    pub action_type: ActionType,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MaintenanceRule {
    /// True when the scheduler should maintain a repeatable job for this
    /// rule.
    pub fn is_scheduled(&self) -> bool {
        self.enabled && self.schedule.is_some()
    }
}
