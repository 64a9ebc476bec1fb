//! # Domain Types
//!
//! Core domain types used throughout Agora.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │      User       │   │     Product     │   │   PurchaseRecord    │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  internal_id    │◄──┼─────────────────┼───│  user_internal_id   │   │
//! │  │  external_uuid  │   │  internal_id    │◄──│  product_internal_id│   │
//! │  │  username ······│···│··> seller       │   │  quantity           │   │
//! │  │  password_hash  │   │  external_uuid  │   └─────────────────────┘   │
//! │  │  email          │   │  name, price    │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ──► owning reference (cascades)   ···> weak back-reference (string)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `internal_id`: store-assigned sequence, used for relations, never exposed
//! - `external_uuid`: UUID v4 string, the only identifier callers ever see

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

// =============================================================================
// Records
// =============================================================================

/// A plain field map as handed to and received from the HTTP layer.
pub type Record = serde_json::Map<String, Value>;

/// Caller-supplied fields for create/update operations.
pub type Fields = Record;

/// Reads a field as text.
///
/// Strings are returned as-is, numbers and booleans are rendered.
/// Null, arrays and objects count as absent.
pub fn field_text(fields: &Fields, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Lookup Keys
// =============================================================================

/// How a user is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey<'a> {
    Uuid(&'a str),
    Username(&'a str),
}

impl<'a> UserKey<'a> {
    /// Column the key is matched against.
    pub fn column(&self) -> &'static str {
        match self {
            UserKey::Uuid(_) => "external_uuid",
            UserKey::Username(_) => "username",
        }
    }

    /// The key value.
    pub fn value(&self) -> &'a str {
        match self {
            UserKey::Uuid(v) | UserKey::Username(v) => v,
        }
    }
}

/// How a product is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKey<'a> {
    Uuid(&'a str),
    Name(&'a str),
}

impl<'a> ProductKey<'a> {
    /// Column the key is matched against.
    pub fn column(&self) -> &'static str {
        match self {
            ProductKey::Uuid(_) => "external_uuid",
            ProductKey::Name(_) => "name",
        }
    }

    /// The key value.
    pub fn value(&self) -> &'a str {
        match self {
            ProductKey::Uuid(v) | ProductKey::Name(v) => v,
        }
    }
}

// =============================================================================
// User
// =============================================================================

/// A marketplace account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    /// Store-assigned sequence. Never leaves the crate boundary in a record.
    #[serde(skip)]
    pub internal_id: i64,

    /// External identifier (UUID v4), immutable.
    pub external_uuid: String,

    /// Unique login name.
    pub username: String,

    /// Digest produced by [`crate::CredentialService::hash`].
    pub password_hash: String,

    /// Unique contact address.
    pub email: String,

    /// Date the account was created.
    pub joined_at: NaiveDate,
}

impl User {
    /// Renders the full record, secure fields included.
    ///
    /// Pass the result through [`crate::visibility::project_visible`]
    /// before handing it to anyone but the owner.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("uuid".into(), Value::String(self.external_uuid.clone()));
        record.insert("username".into(), Value::String(self.username.clone()));
        record.insert("password".into(), Value::String(self.password_hash.clone()));
        record.insert("email".into(), Value::String(self.email.clone()));
        record.insert(
            "joined_at".into(),
            Value::String(self.joined_at.format("%Y-%m-%d").to_string()),
        );
        record
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    #[serde(skip)]
    #[ts(skip)]
    pub internal_id: i64,

    /// External identifier (UUID v4), immutable.
    pub external_uuid: String,

    /// Unique display name.
    pub name: String,

    pub description: String,

    /// Defaults to [`crate::DEFAULT_CATEGORY`].
    pub category: String,

    /// Currency-suffixed price, e.g. `"12.50 PLN"`. Never parsed.
    pub price: String,

    /// Username of the creator. A lookup key, not a foreign key.
    pub seller: String,
}

impl Product {
    /// Renders the product as a record.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("uuid".into(), Value::String(self.external_uuid.clone()));
        record.insert("name".into(), Value::String(self.name.clone()));
        record.insert("description".into(), Value::String(self.description.clone()));
        record.insert("category".into(), Value::String(self.category.clone()));
        record.insert("price".into(), Value::String(self.price.clone()));
        record.insert("seller".into(), Value::String(self.seller.clone()));
        record
    }
}

// =============================================================================
// Purchase Ledger
// =============================================================================

/// One ledger row: how many units of a product a user has bought in total.
///
/// At most one row exists per (user, product) pair and its quantity only
/// ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseRecord {
    pub internal_id: i64,
    pub quantity: i64,
    pub user_internal_id: i64,
    pub product_internal_id: i64,
}

/// Result of recording a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuyOutcome {
    /// The ledger row now holds `total_quantity` units.
    Recorded { total_quantity: i64 },
    /// The buyer does not exist; nothing was written.
    UserNotFound,
    /// The product does not exist; nothing was written.
    ProductNotFound,
}

impl BuyOutcome {
    /// Whether the purchase was written to the ledger.
    pub fn is_recorded(&self) -> bool {
        matches!(self, BuyOutcome::Recorded { .. })
    }
}

// =============================================================================
// Sales Analytics
// =============================================================================

/// A product ranked by units sold across all buyers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TopSeller {
    pub product_name: String,
    pub product_uuid: String,
    pub total_quantity: i64,
}

/// A product in one user's purchase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchasedProduct {
    pub uuid: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub seller: String,
    pub quantity: i64,
}

/// One of a seller's products that has been bought at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SellerSale {
    pub uuid: String,
    pub name: String,
    pub category: String,
    pub price: String,
    pub total_quantity: i64,
    /// Distinct users who bought the product.
    pub buyers: i64,
}

/// Number of catalog entries in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CategoryCount {
    pub category: String,
    pub products: i64,
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a listing plus the metadata the caller echoes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total rows matching the listing's filter (not just this page).
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl Page<Record> {
    /// The page keyed by each record's external uuid.
    pub fn keyed(&self) -> BTreeMap<String, Record> {
        self.items
            .iter()
            .filter_map(|record| {
                let uuid = record.get("uuid")?.as_str()?.to_string();
                Some((uuid, record.clone()))
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_user() -> User {
        User {
            internal_id: 7,
            external_uuid: "550e8400-e29b-41d4-a716-446655440000".to_string(),
            username: "konrad".to_string(),
            password_hash: "$argon2id$digest".to_string(),
            email: "konrad@example.com".to_string(),
            joined_at: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn test_user_record_never_carries_internal_id() {
        let record = sample_user().to_record();
        assert!(record.get("internal_id").is_none());
        assert_eq!(record["uuid"], "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(record["joined_at"], "2024-03-01");
        assert_eq!(record["password"], "$argon2id$digest");
    }

    #[test]
    fn test_field_text() {
        let mut fields = Fields::new();
        fields.insert("name".into(), json!("drill"));
        fields.insert("price".into(), json!(12));
        fields.insert("empty".into(), Value::Null);
        fields.insert("nested".into(), json!({"a": 1}));

        assert_eq!(field_text(&fields, "name").as_deref(), Some("drill"));
        assert_eq!(field_text(&fields, "price").as_deref(), Some("12"));
        assert_eq!(field_text(&fields, "empty"), None);
        assert_eq!(field_text(&fields, "nested"), None);
        assert_eq!(field_text(&fields, "missing"), None);
    }

    #[test]
    fn test_lookup_keys() {
        assert_eq!(UserKey::Username("kuba").column(), "username");
        assert_eq!(UserKey::Uuid("x").column(), "external_uuid");
        assert_eq!(ProductKey::Name("axe").value(), "axe");
        assert_eq!(ProductKey::Name("axe").column(), "name");
    }

    #[test]
    fn test_page_keyed_by_uuid() {
        let mut a = Record::new();
        a.insert("uuid".into(), json!("b-uuid"));
        let mut b = Record::new();
        b.insert("uuid".into(), json!("a-uuid"));

        let page = Page {
            items: vec![a, b],
            total: 2,
            limit: 10,
            offset: 0,
        };

        let keyed = page.keyed();
        assert_eq!(keyed.len(), 2);
        assert!(keyed.contains_key("a-uuid"));
        assert!(keyed.contains_key("b-uuid"));
    }

    #[test]
    fn test_buy_outcome() {
        assert!(BuyOutcome::Recorded { total_quantity: 3 }.is_recorded());
        assert!(!BuyOutcome::UserNotFound.is_recorded());
    }
}
