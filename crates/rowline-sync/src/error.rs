use rowline_model::DataSourceId;
use thiserror::Error;

/// Errors raised while orchestrating a sync.
///
/// The taxonomy drives the retry policy: configuration errors are never
/// retried, connection and timeout failures are retried per the schedule's
/// retry settings, and cancellation is terminal for the attempt.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("data source not found: {0}")]
    NotFound(DataSourceId),
    #[error("data source {0} is already syncing")]
    AlreadySyncing(DataSourceId),
    #[error("configuration error: {}", .0.join("; "))]
    Config(Vec<String>),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("sync exceeded its time budget")]
    Timeout,
    #[error("sync cancelled")]
    Cancelled,
    #[error("store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Whether the schedule's retry policy applies to this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Connection(_) | SyncError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connection_and_timeout_are_retryable() {
        assert!(SyncError::Connection("down".to_string()).is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(!SyncError::Config(vec!["bad".to_string()]).is_retryable());
        assert!(!SyncError::Cancelled.is_retryable());
        assert!(!SyncError::AlreadySyncing(DataSourceId::new("x")).is_retryable());
    }
}
