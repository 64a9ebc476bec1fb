//! # Error Types
//!
//! Domain-specific error types for agora-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  agora-core errors (this file)                                         │
//! │  ├── CoreError        - Domain failures (incomplete data, hashing)     │
//! │  └── ValidationError  - Input format failures                          │
//! │                                                                         │
//! │  agora-db errors (separate crate)                                      │
//! │  └── DbError          - Store failures, wraps CoreError                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → HTTP layer              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A mandatory field was absent on create.
    ///
    /// ## When This Occurs
    /// - `username`, `password` or `email` missing from a new user
    /// - `name`, `description` or `price` missing from a new product
    ///
    /// Detected before anything is written. The caller must fix the request;
    /// retrying the same input fails the same way.
    #[error("Incomplete {entity} data: missing {field}")]
    IncompleteData { entity: String, field: String },

    /// The credential hasher could not produce or read a digest.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an IncompleteData error for a given entity and field.
    pub fn incomplete(entity: impl Into<String>, field: impl Into<String>) -> Self {
        CoreError::IncompleteData {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
