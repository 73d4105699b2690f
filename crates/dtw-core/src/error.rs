use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors surfaced by the feed core.
///
/// Identifier and decode failures are normally recovered where they occur
/// (the offending record is dropped); transaction and user-initiated fetch
/// failures are returned to the caller for display.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed account identifier {value:?}: {reason}")]
    MalformedIdentifier { value: String, reason: String },

    #[error("remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("moderation unavailable: {0}")]
    ModerationUnavailable(String),

    #[error("{0}")]
    ContentRejected(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn malformed(value: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::MalformedIdentifier {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Re-label a collaborator failure raised while submitting or confirming.
    pub(crate) fn into_transaction(self) -> Self {
        match self {
            CoreError::Transaction(_) => self,
            other => CoreError::Transaction(other.to_string()),
        }
    }

    /// True for failures that only make the feed stale, never inconsistent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::MalformedIdentifier { .. }
                | CoreError::RemoteFetch(_)
                | CoreError::ModerationUnavailable(_)
        )
    }
}
