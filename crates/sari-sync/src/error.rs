//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! Callers above the engine rarely see these: the lifecycle entry points
//! absorb every failure and log it, because sync must never break a sale.
//! The fallible `try_push` / `try_pull` variants exist for tests and for
//! any future UI that wants to show sync state.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Remote Store Errors
    // =========================================================================
    /// The remote store could not be reached (offline, timeout).
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote store refused the request (auth, quota, malformed doc).
    #[error("Remote store rejected request: {0}")]
    RemoteRejected(String),

    // =========================================================================
    // Watermark Errors
    // =========================================================================
    /// The durable watermark could not be read.
    #[error("Failed to load sync watermark: {0}")]
    WatermarkLoadFailed(String),

    /// The durable watermark could not be written.
    ///
    /// After a successful push this is the one failure that causes
    /// re-pushing already-uploaded rows next time; upserts keyed by id
    /// make that harmless.
    #[error("Failed to save sync watermark: {0}")]
    WatermarkSaveFailed(String),

    // =========================================================================
    // Local Database Errors
    // =========================================================================
    /// Reading local changes or applying remote ones failed.
    #[error("Database error during sync: {0}")]
    DatabaseError(String),

    /// Serializing documents for the remote store failed.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<sari_db::DbError> for SyncError {
    fn from(err: sari_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl SyncError {
    /// Whether the operation can simply be retried on the next lifecycle
    /// trigger. Connectivity comes and goes; rejections and local errors
    /// won't fix themselves.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnavailable(_) | SyncError::WatermarkSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::RemoteUnavailable("offline".into()).is_retryable());
        assert!(SyncError::WatermarkSaveFailed("disk full".into()).is_retryable());

        assert!(!SyncError::RemoteRejected("unauthorized".into()).is_retryable());
        assert!(!SyncError::DatabaseError("corrupt".into()).is_retryable());
    }
}
