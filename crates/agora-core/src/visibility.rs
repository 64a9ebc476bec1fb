//! # Field Visibility and Mutability
//!
//! Two projections over records:
//!
//! - [`project_visible`] strips the secure field set from any record not
//!   requested by its authenticated owner.
//! - [`project_mutable`] keeps only the keys an update may touch. Unknown or
//!   forbidden keys are dropped silently, never rejected.

use crate::types::{Fields, Record};

/// User fields only the authenticated owner may see.
pub const SECURE_USER_FIELDS: &[&str] = &["password", "email", "internal_id"];

/// User fields an update may change.
pub const MUTABLE_USER_FIELDS: &[&str] = &["password", "email"];

/// Product fields an update may change.
pub const MUTABLE_PRODUCT_FIELDS: &[&str] = &["name", "description", "category", "price"];

/// Returns `record` as the viewer may see it.
pub fn project_visible(record: &Record, secure: &[&str], viewer_is_owner: bool) -> Record {
    if viewer_is_owner {
        return record.clone();
    }

    record
        .iter()
        .filter(|(key, _)| !secure.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Returns the subset of `fields` whose keys are in `allowed`.
pub fn project_mutable(fields: &Fields, allowed: &[&str]) -> Fields {
    fields
        .iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
