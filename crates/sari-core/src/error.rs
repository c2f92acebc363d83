//! # Error Types
//!
//! Validation errors for sari-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  sari-core (this file)                                                 │
//! │  └── ValidationError  - malformed or missing input                     │
//! │                                                                         │
//! │  sari-db                                                               │
//! │  └── DbError          - NotFound / InvalidState / Inconsistent /       │
//! │                         storage failures; absorbs ValidationError      │
//! │                                                                         │
//! │  sari-sync                                                             │
//! │  └── SyncError        - any push/pull failure; swallowed at the        │
//! │                         engine boundary by design                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive, never manual Display impls
//! 2. Errors carry context (field names, limits), never bare strings
//! 3. Each variant maps to a user-facing message

use thiserror::Error;

/// Input validation errors.
///
/// Raised before any storage work happens; the database layer converts
/// these into its InvalidArgument variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// A collection that must not be empty is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ValidationError::Required {
            field: "borrower_name".to_string(),
        };
        assert_eq!(err.to_string(), "borrower_name is required");

        let err = ValidationError::Empty {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items must not be empty");
    }
}
