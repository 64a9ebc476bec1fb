//! # Validation Module
//!
//! Input format rules for the Agora marketplace.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP layer                                                   │
//! │  ├── Request parsing                                                   │
//! │  └── THIS MODULE: format checks before calling a repository            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repositories (agora-db)                                      │
//! │  ├── Mandatory-field checks (IncompleteData)                           │
//! │  └── Uniqueness pre-checks                                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories never call these functions themselves.
//!
//! ## Usage
//! ```rust,no_run
//! use agora_core::validation::{validate_email, validate_username};
//!
//! validate_username("konrad").unwrap();
//! validate_email("konrad@example.com").unwrap();
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::MAX_PAGE_SIZE;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.chars().count();

    if len == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }

    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates a username.
///
/// ## Rules
/// - Between 4 and 20 characters
/// - Letters, digits and underscores only
///
/// ## Example
/// ```rust
/// use agora_core::validation::validate_username;
///
/// assert!(validate_username("konrad_1").is_ok());
/// assert!(validate_username("abc").is_err());
/// assert!(validate_username("has space").is_err());
/// ```
pub fn validate_username(username: &str) -> ValidationResult<()> {
    check_length("username", username, 4, 20)?;

    if !username.chars().all(is_word_char) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - `local@domain.tld`, case-insensitive
/// - local part: letters, digits, `-`, `_`, `.`
/// - domain labels: letters, digits, `-`
/// - top-level domain: 2 to 6 letters
///
/// ## Example
/// ```rust
/// use agora_core::validation::validate_email;
///
/// assert!(validate_email("konrad@example.com").is_ok());
/// assert!(validate_email("konrad@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^[-a-z0-9_.]+@(?:[-a-z0-9]+\.)+[a-z]{2,6}$").expect("email pattern compiles")
    });

    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }

    Ok(())
}

/// Validates a cleartext password before hashing.
///
/// ## Rules
/// - Between 4 and 19 characters
pub fn validate_password(password: &str) -> ValidationResult<()> {
    check_length("password", password, 4, 19)
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Between 4 and 20 characters
/// - Letters, digits, underscores and spaces
///
/// ## Example
/// ```rust
/// use agora_core::validation::validate_product_name;
///
/// assert!(validate_product_name("pila mechaniczna").is_ok());
/// assert!(validate_product_name("axe").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    check_length("name", name, 4, 20)?;

    if !name.chars().all(|c| is_word_char(c) || c.is_whitespace()) {
        return Err(ValidationError::InvalidFormat {
            field: "name".to_string(),
            reason: "must contain only letters, numbers, underscores, and spaces".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Listing Validators
// =============================================================================

/// Validates listing pagination.
///
/// ## Rules
/// - `limit` between 1 and [`MAX_PAGE_SIZE`]
/// - `offset` not negative
pub fn validate_pagination(limit: i64, offset: i64) -> ValidationResult<()> {
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE,
        });
    }

    if offset < 0 {
        return Err(ValidationError::OutOfRange {
            field: "offset".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use agora_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "uuid".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "uuid".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
