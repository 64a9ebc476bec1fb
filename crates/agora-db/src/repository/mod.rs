//! # Repository Module
//!
//! Database repository implementations for Agora.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.users().get(UserKey::Uuid(id), false)                      │
//! │       ▼                                                                 │
//! │  UserRepository / ProductRepository / PurchaseLedger / SalesAnalytics  │
//! │  ├── validates mandatory fields before any write                       │
//! │  ├── opens a scoped transaction for every write                        │
//! │  └── returns plain records, never sqlx types                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scoped Transactions
//! Every write runs inside `begin_write` … `tx.commit()`. Returning early
//! with `?` drops the transaction, which rolls it back, so no exit path
//! leaves a transaction open. Statements inside a transaction always run on
//! the transaction's own connection.
//!
//! Write transactions start with `BEGIN IMMEDIATE`. A deferred transaction
//! that reads first holds a read lock, and two of them cannot both upgrade
//! to a write lock: SQLite fails one with SQLITE_BUSY at once instead of
//! waiting. Taking the write lock up front makes concurrent writers queue
//! on the busy timeout.
//!
//! ## Available Repositories
//!
//! - [`UserRepository`](user::UserRepository) - Accounts and credentials
//! - [`ProductRepository`](product::ProductRepository) - Catalog
//! - [`PurchaseLedger`](purchase::PurchaseLedger) - Per-user purchase totals
//! - [`SalesAnalytics`](analytics::SalesAnalytics) - Read-only sales views

pub mod analytics;
pub mod product;
pub mod purchase;
pub mod user;

use agora_core::{field_text, Fields};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};

/// Opens a write transaction holding the database write lock.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Reads a mandatory text field; empty values count as missing.
pub(crate) fn required_text(fields: &Fields, entity: &str, key: &str) -> DbResult<String> {
    update_text(fields, key).ok_or_else(|| DbError::incomplete(entity, key))
}

/// Reads an update value. Blank values are skipped: they would clear a
/// field that `create` requires.
pub(crate) fn update_text(fields: &Fields, key: &str) -> Option<String> {
    field_text(fields, key).filter(|value| !value.trim().is_empty())
}
