//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Handles What                                     │
//! │                                                                         │
//! │  InvalidArgument ─┐                                                     │
//! │  NotFound        ─┼─► caller / UI: user-correctable problems           │
//! │  InvalidState    ─┘                                                     │
//! │                                                                         │
//! │  Inconsistent    ─┐   fatal for the operation: a child row references  │
//! │  QueryFailed     ─┼─► a missing parent, or the store itself failed.    │
//! │  ConnectionFailed─┘   Transaction rollback keeps other data intact.    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sari_core::ValidationError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed or missing required input (empty sale, overpayment,
    /// missing borrower name for a credit sale, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Operation not permitted in the entity's current state
    /// (e.g. paying a resolved borrow, deleting a referenced product).
    #[error("{entity} {id}: {reason}")]
    InvalidState {
        entity: String,
        id: String,
        reason: String,
    },

    /// A referential invariant is violated: a child row references a missing
    /// parent. Data corruption, not user error — treat as fatal.
    #[error("Data inconsistency: {0}")]
    Inconsistent(String),

    /// Unique constraint violation.
    #[error("Duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation (storage-level backstop).
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A schema migration step failed. Fatal at startup; the version
    /// counter is never advanced past a failed step.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DbError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True for the user-correctable variants (InvalidArgument / NotFound /
    /// InvalidState); false for corruption and storage failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DbError::InvalidArgument(_) | DbError::NotFound { .. } | DbError::InvalidState { .. }
        )
    }
}

/// Validation failures surface to callers as InvalidArgument.
impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::InvalidArgument(err.to_string())
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // UNIQUE: "UNIQUE constraint failed: <table>.<column>"
                // FK: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
