//! # agora-core: Pure Domain Logic for the Agora Marketplace
//!
//! This crate holds everything about accounts, products and purchases that
//! does not need a database: the domain types, credential hashing, field
//! visibility rules and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Agora Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 HTTP layer (external consumer)                  │   │
//! │  │     /users  /user  /products  /buy  /top-sellers               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ agora-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌────────────┐  ┌──────────┐ │   │
//! │  │   │   types   │  │ credentials │  │ visibility │  │validation│ │   │
//! │  │   │   User    │  │   hash      │  │  secure    │  │ username │ │   │
//! │  │   │  Product  │  │   verify    │  │  mutable   │  │  email   │ │   │
//! │  │   └───────────┘  └─────────────┘  └────────────┘  └──────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    agora-db (Database Layer)                    │   │
//! │  │        repositories, purchase ledger, sales analytics           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Product, PurchaseRecord, records)
//! - [`credentials`] - Secret hashing and verification
//! - [`visibility`] - Secure/mutable field projections
//! - [`error`] - Domain error types
//! - [`validation`] - Input format rules
//!
//! ## Example Usage
//!
//! ```rust
//! use agora_core::visibility::{project_visible, SECURE_USER_FIELDS};
//! use agora_core::Record;
//! use serde_json::json;
//!
//! let mut record = Record::new();
//! record.insert("username".into(), json!("konrad"));
//! record.insert("email".into(), json!("konrad@example.com"));
//!
//! let public = project_visible(&record, SECURE_USER_FIELDS, false);
//! assert!(public.get("email").is_none());
//! assert_eq!(public["username"], "konrad");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod credentials;
pub mod error;
pub mod types;
pub mod validation;
pub mod visibility;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use credentials::{CredentialService, HashingCost};
pub use error::{CoreError, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Category assigned to a product created without one.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Upper bound on attempts to draw an unused external identifier.
///
/// A v4 collision is practically impossible; the bound exists so the
/// generator always terminates.
pub const MAX_ID_ATTEMPTS: u32 = 10;

/// Largest page a listing will return.
pub const MAX_PAGE_SIZE: i64 = 100;
