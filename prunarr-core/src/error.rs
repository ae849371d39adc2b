use prunarr_model::ids::RuleId;
use thiserror::Error;

/// Error taxonomy of the maintenance engine.
///
/// Public entry points (scanner, deletion executor) never let these escape:
/// they translate failures into structured outcomes. Worker handlers
/// re-raise retryable errors so the queue's retry/backoff applies.
#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("Rule not found: {0}")]
    RuleNotFound(RuleId),

    #[error("Rule '{name}' ({id}) is disabled")]
    RuleDisabled { id: RuleId, name: String },

    #[error("Invalid rule: {0}")]
    RuleInvalid(String),

    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream authentication failed: {0}")]
    UpstreamAuth(String),

    #[error("Malformed upstream response: {0}")]
    UpstreamBadResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Criteria(#[from] prunarr_model::ModelError),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    /// Fallthrough for non-error-shaped failures crossing a boundary.
    #[error("Unknown error occurred")]
    Unknown,
}

impl MaintenanceError {
    /// Whether the queue should retry a job that failed with this error.
    ///
    /// Rule errors are permanent and recorded on the scan row; transport
    /// and store errors are worth another attempt. Bad credentials retry
    /// per policy even though they will likely keep failing.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MaintenanceError::UpstreamUnavailable(_)
                | MaintenanceError::UpstreamAuth(_)
                | MaintenanceError::Database(_)
                | MaintenanceError::Queue(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MaintenanceError>;
