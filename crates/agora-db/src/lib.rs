//! # agora-db: Storage Layer for Agora
//!
//! This crate binds the Agora marketplace core to SQLite.
//! It uses sqlx for async access and embeds its migrations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Agora Data Flow                                  │
//! │                                                                         │
//! │  HTTP handler / CLI (out of scope)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     agora-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ UserRepository │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo    │   │ 001_initial_ │  │   │
//! │  │   │ Credentials   │    │ PurchaseLedger │   │   schema.sql │  │   │
//! │  │   │               │    │ SalesAnalytics │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  │           │                    │                                │   │
//! │  │           └──── identity.rs (collision-free external uuids)    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SQLite: users · products · purchase_records                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`identity`] - External identifier generation
//! - [`error`] - Database error types
//! - [`repository`] - Users, products, ledger, analytics
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agora_db::{Database, DbConfig};
//!
//! let config = DbConfig::new("path/to/agora.db").secret_key(secret);
//! let db = Database::new(config).await?;
//!
//! let buyer = db.users().create(&fields).await?;
//! db.ledger().buy(2, &buyer, &product).await?;
//! let best = db.analytics().top_sellers(10).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod identity;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use identity::{IdentityGenerator, IdentityScope};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::analytics::SalesAnalytics;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseLedger;
pub use repository::user::UserRepository;
