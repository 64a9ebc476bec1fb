//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          CoreError (agora-core)            │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  HTTP layer ← maps variants to status codes                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing row is not an error anywhere in this crate: reads return
//! `None`/empty and deletes are no-ops.

use agora_core::CoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A mandatory field was missing on create.
    ///
    /// ## When This Occurs
    /// - Creating a user without username, password or email
    /// - Creating a product without name, description or price
    ///
    /// Raised before anything is written.
    #[error("Incomplete {entity} data: missing {field}")]
    IncompleteData { entity: String, field: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two concurrent creates both passed the uniqueness pre-check
    /// - Caller skipped `credentials_unique` / `name_unique`
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A scoped transaction failed and was rolled back.
    #[error("{operation} failed for '{id}': {message}")]
    Persistence {
        operation: String,
        id: String,
        message: String,
    },

    /// No unused identifier was found within the attempt bound.
    #[error("No unused identifier for {scope} after {attempts} attempts")]
    IdentityExhausted { scope: String, attempts: u32 },

    /// The credential hasher failed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Caller input was rejected by a validation rule.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
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
    /// Creates an IncompleteData error.
    pub fn incomplete(entity: impl Into<String>, field: impl Into<String>) -> Self {
        DbError::IncompleteData {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Attaches the failing operation and entity identifier.
    ///
    /// Store failures become [`DbError::Persistence`]. Errors that already
    /// name their cause (uniqueness, incomplete data, identity exhaustion,
    /// credentials, input) pass through unchanged.
    pub fn in_operation(self, operation: &str, id: &str) -> Self {
        match self {
            DbError::UniqueViolation { .. }
            | DbError::IncompleteData { .. }
            | DbError::IdentityExhausted { .. }
            | DbError::Credential(_)
            | DbError::InvalidInput(_)
            | DbError::Persistence { .. } => self,
            other => DbError::Persistence {
                operation: operation.to_string(),
                id: id.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
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

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::IncompleteData { entity, field } => DbError::IncompleteData { entity, field },
            CoreError::Credential(msg) => DbError::Credential(msg),
            CoreError::Validation(e) => DbError::InvalidInput(e.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_operation_wraps_store_failures() {
        let err = DbError::QueryFailed("disk I/O error".to_string()).in_operation("user.create", "konrad");

        match err {
            DbError::Persistence { operation, id, message } => {
                assert_eq!(operation, "user.create");
                assert_eq!(id, "konrad");
                assert!(message.contains("disk I/O error"));
            }
            other => panic!("expected Persistence, got {other:?}"),
        }
    }

    #[test]
    fn test_in_operation_keeps_unique_violation() {
        let err = DbError::duplicate("users.username", "konrad").in_operation("user.create", "konrad");
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[test]
    fn test_core_error_conversion() {
        let err: DbError = CoreError::incomplete("product", "price").into();
        assert!(matches!(err, DbError::IncompleteData { ref field, .. } if field == "price"));
        assert_eq!(err.to_string(), "Incomplete product data: missing price");
    }
}
