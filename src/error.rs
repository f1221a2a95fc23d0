use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// All retry attempts for an external call failed. Carries enough
    /// context to identify the call in logs without string parsing.
    #[error("{service}.{operation} exhausted retries for user {user_id}: {source}")]
    RetryExhausted {
        service: &'static str,
        operation: &'static str,
        user_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("recommendation generation failed for user {user_id}: {reason}")]
    RecommendationGenerationFailed { user_id: String, reason: String },

    #[error("failed to schedule {kind} notification for user {user_id}: {source}")]
    SchedulingFailed {
        kind: &'static str,
        user_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid timezone id: {0}")]
    InvalidTimezone(String),

    #[error("invalid preferred time: {0}")]
    InvalidPreferredTime(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
