//! # Identity Generator
//!
//! Draws external identifiers that are unused within their scope.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  attempt 1..=max_attempts                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  candidate = Uuid::new_v4()  ("xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx")  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT EXISTS(SELECT 1 FROM <table> WHERE <column> = candidate)       │
//! │       │                                                                 │
//! │       ├── 0 → return candidate                                         │
//! │       └── 1 → next attempt                                             │
//! │                                                                         │
//! │  all attempts collided → DbError::IdentityExhausted                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The existence check runs on the caller's connection, so inside a
//! transaction it sees that transaction's writes. The store serializes
//! concurrent checks; the UNIQUE constraint on the column is the backstop.

use std::fmt;

use agora_core::MAX_ID_ATTEMPTS;
use sqlx::SqliteConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// A column holding external identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityScope {
    pub table: &'static str,
    pub column: &'static str,
}

impl IdentityScope {
    pub const USERS: IdentityScope = IdentityScope {
        table: "users",
        column: "external_uuid",
    };

    pub const PRODUCTS: IdentityScope = IdentityScope {
        table: "products",
        column: "external_uuid",
    };
}

impl fmt::Display for IdentityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Checks whether `value` is already taken within `scope`.
pub async fn exists(conn: &mut SqliteConnection, scope: IdentityScope, value: &str) -> DbResult<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
        scope.table, scope.column
    );

    let found: i64 = sqlx::query_scalar(&sql).bind(value).fetch_one(conn).await?;

    Ok(found != 0)
}

/// Generates collision-free external identifiers.
#[derive(Debug, Clone, Copy)]
pub struct IdentityGenerator {
    max_attempts: u32,
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        IdentityGenerator {
            max_attempts: MAX_ID_ATTEMPTS,
        }
    }
}

impl IdentityGenerator {
    /// Creates a generator that gives up after `max_attempts` collisions.
    pub fn new(max_attempts: u32) -> Self {
        IdentityGenerator { max_attempts }
    }

    /// Returns a fresh UUID v4 string unused within `scope`.
    pub async fn generate_unique_id(
        &self,
        conn: &mut SqliteConnection,
        scope: IdentityScope,
    ) -> DbResult<String> {
        self.generate_with(conn, scope, Uuid::new_v4).await
    }

    /// Like [`generate_unique_id`](Self::generate_unique_id) with a custom
    /// candidate source.
    pub async fn generate_with<F>(
        &self,
        conn: &mut SqliteConnection,
        scope: IdentityScope,
        mut candidate: F,
    ) -> DbResult<String>
    where
        F: FnMut() -> Uuid,
    {
        for attempt in 1..=self.max_attempts {
            let id = candidate().hyphenated().to_string();

            if !exists(&mut *conn, scope, &id).await? {
                debug!(%scope, attempt, "Generated identifier");
                return Ok(id);
            }

            warn!(%scope, attempt, id = %id, "Identifier collision");
        }

        Err(DbError::IdentityExhausted {
            scope: scope.to_string(),
            attempts: self.max_attempts,
        })
    }
}
