//! Error types for the sync engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Remote service unreachable: {0}")]
    Unreachable(String),

    #[error("Remote service rejected the operation: {0}")]
    Remote(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Connectivity lost")]
    Offline,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether the failure concerns the link to the remote service rather
    /// than a single record. Such errors abort a whole sync cycle.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SyncError::Unreachable(_) | SyncError::Offline)
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SyncError::Unreachable(err.to_string())
        } else if err.is_decode() {
            SyncError::Serialization(err.to_string())
        } else {
            SyncError::Remote(err.to_string())
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_classification() {
        assert!(SyncError::Unreachable("connection refused".into()).is_unreachable());
        assert!(SyncError::Offline.is_unreachable());
        assert!(!SyncError::Remote("400 Bad Request".into()).is_unreachable());
        assert!(!SyncError::NotFound("vehicles/abc".into()).is_unreachable());
    }

    #[test]
    fn test_json_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let sync_err: SyncError = err.into();
        assert!(matches!(sync_err, SyncError::Serialization(_)));
    }
}
