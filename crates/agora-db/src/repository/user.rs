//! # User Repository
//!
//! Database operations for marketplace accounts.
//!
//! ## Account Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. PRE-CHECK (caller)                                                 │
//! │     └── credentials_unique(username, email)                            │
//! │                                                                         │
//! │  2. CREATE                                                             │
//! │     └── create(fields) → uuid                                          │
//! │         ├── username, password, email present? else IncompleteData     │
//! │         ├── password → CredentialService::hash                         │
//! │         └── [tx] generate uuid → INSERT → COMMIT                        │
//! │                                                                         │
//! │  3. READ                                                               │
//! │     └── get(key, reveal_secure) → record, secure fields stripped       │
//! │         unless the caller authenticated as this user                   │
//! │                                                                         │
//! │  4. UPDATE (password, email only; other keys dropped silently)         │
//! │                                                                         │
//! │  5. DELETE (idempotent; ledger rows cascade)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The (username, email) pre-check and the insert are separate steps. Two
//! racing creates can both pass the pre-check; the loser then fails with
//! [`DbError::UniqueViolation`] from the store's UNIQUE constraints.

use std::sync::Arc;

use agora_core::visibility::{project_mutable, project_visible, MUTABLE_USER_FIELDS, SECURE_USER_FIELDS};
use agora_core::{CredentialService, Fields, Page, Record, User, UserKey};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};

use super::{begin_write, required_text, update_text};
use crate::error::{DbError, DbResult};
use crate::identity::{self, IdentityGenerator, IdentityScope};

const USER_COLUMNS: &str = "internal_id, external_uuid, username, password_hash, email, joined_at";

/// Fields a new user must supply.
pub const MANDATORY_USER_FIELDS: &[&str] = &["username", "password", "email"];

/// Repository for user database operations.
///
/// ## Usage
/// ```rust,ignore
/// let users = db.users();
///
/// if users.credentials_unique("konrad", "konrad@example.com").await? {
///     let uuid = users.create(&fields).await?;
/// }
///
/// let public = users.get(UserKey::Uuid(&uuid), false).await?;
/// ```
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    credentials: Arc<CredentialService>,
    ids: IdentityGenerator,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool, credentials: Arc<CredentialService>) -> Self {
        UserRepository {
            pool,
            credentials,
            ids: IdentityGenerator::default(),
        }
    }

    /// Creates a user and returns its external uuid.
    ///
    /// ## Arguments
    /// * `fields` - must contain `username`, `password` (cleartext) and `email`;
    ///   other keys are ignored
    ///
    /// ## Returns
    /// * `Ok(uuid)` - the new user's external identifier
    /// * `Err(DbError::IncompleteData)` - a mandatory field is missing (nothing written)
    /// * `Err(DbError::UniqueViolation)` - username or email taken (rolled back)
    /// * `Err(DbError::Persistence)` - any other store failure (rolled back)
    pub async fn create(&self, fields: &Fields) -> DbResult<String> {
        let username = required_text(fields, "user", "username")?;
        let password = required_text(fields, "user", "password")?;
        let email = required_text(fields, "user", "email")?;

        let password_hash = self.credentials.hash(&password)?;
        let joined_at = Utc::now().date_naive();

        debug!(username = %username, "Creating user");

        let uuid = self
            .insert(&username, &password_hash, &email, joined_at)
            .await
            .map_err(|e| {
                warn!(username = %username, error = %e, "User insert rolled back");
                e.in_operation("user.create", &username)
            })?;

        info!(uuid = %uuid, username = %username, "User created");
        Ok(uuid)
    }

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
        joined_at: NaiveDate,
    ) -> DbResult<String> {
        let mut tx = begin_write(&self.pool).await?;

        let uuid = self
            .ids
            .generate_unique_id(&mut tx, IdentityScope::USERS)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO users (external_uuid, username, password_hash, email, joined_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&uuid)
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .bind(joined_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(uuid)
    }

    async fn fetch(&self, key: UserKey<'_>) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {} = ?1", key.column());

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(key.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Gets a user record.
    ///
    /// ## Arguments
    /// * `key` - external uuid or username
    /// * `reveal_secure` - the caller has authenticated as this user
    ///
    /// ## Returns
    /// * `Ok(record)` - password and email stripped unless `reveal_secure`
    /// * `Ok(empty)` - no such user
    pub async fn get(&self, key: UserKey<'_>, reveal_secure: bool) -> DbResult<Record> {
        debug!(key = ?key, reveal_secure, "Getting user");

        Ok(self
            .fetch(key)
            .await?
            .map(|user| project_visible(&user.to_record(), SECURE_USER_FIELDS, reveal_secure))
            .unwrap_or_default())
    }

    /// Gets `(username, password_hash)` for the login path.
    ///
    /// Internal use only: the digest is never projected away here.
    pub async fn get_credentials(&self, key: UserKey<'_>) -> DbResult<Option<(String, String)>> {
        let sql = format!(
            "SELECT username, password_hash FROM users WHERE {} = ?1",
            key.column()
        );

        let credentials = sqlx::query_as::<_, (String, String)>(&sql)
            .bind(key.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(credentials)
    }

    /// Checks a cleartext secret against the stored digest.
    ///
    /// An unknown user never verifies.
    pub async fn verify_credentials(&self, key: UserKey<'_>, secret: &str) -> DbResult<bool> {
        let verified = match self.get_credentials(key).await? {
            Some((_, digest)) => self.credentials.verify(secret, &digest),
            None => false,
        };

        debug!(key = ?key, verified, "Verified credentials");
        Ok(verified)
    }

    /// Applies the permitted subset of `fields`.
    ///
    /// Only `password` and `email` may change; every other key is dropped
    /// without error. Blank values are skipped. A new password is hashed
    /// before it is stored.
    ///
    /// ## Returns
    /// The applied fields with their stored values (the digest for
    /// `password`). Empty when nothing was permitted or the user does not
    /// exist.
    pub async fn update(&self, key: UserKey<'_>, fields: &Fields) -> DbResult<Fields> {
        let permitted = project_mutable(fields, MUTABLE_USER_FIELDS);

        let mut assignments: Vec<(&'static str, &str, String)> = Vec::new();
        for &name in MUTABLE_USER_FIELDS {
            let Some(value) = update_text(&permitted, name) else {
                continue;
            };
            match name {
                "password" => {
                    assignments.push(("password_hash", name, self.credentials.hash(&value)?))
                }
                _ => assignments.push((name, name, value)),
            }
        }

        if assignments.is_empty() {
            debug!(key = ?key, "No permitted fields to update");
            return Ok(Fields::new());
        }

        debug!(key = ?key, fields = assignments.len(), "Updating user");

        let updated = self
            .apply_update(key, &assignments)
            .await
            .map_err(|e| e.in_operation("user.update", key.value()))?;

        if !updated {
            return Ok(Fields::new());
        }

        Ok(assignments
            .into_iter()
            .map(|(_, name, value)| (name.to_string(), Value::String(value)))
            .collect())
    }

    async fn apply_update(
        &self,
        key: UserKey<'_>,
        assignments: &[(&'static str, &str, String)],
    ) -> DbResult<bool> {
        let mut tx = begin_write(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        {
            let mut set = query.separated(", ");
            for (column, _, value) in assignments {
                set.push(format!("{column} = "));
                set.push_bind_unseparated(value.clone());
            }
        }
        query.push(format!(" WHERE {} = ", key.column()));
        query.push_bind(key.value().to_string());

        let result = query.build().execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user. Deleting a missing user is a no-op.
    ///
    /// The user's ledger rows go with it (ON DELETE CASCADE). Products the
    /// user sells are untouched: `seller` is only a name.
    pub async fn delete(&self, key: UserKey<'_>) -> DbResult<()> {
        let removed = self
            .remove(key)
            .await
            .map_err(|e| e.in_operation("user.delete", key.value()))?;

        debug!(key = ?key, removed, "Deleted user");
        Ok(())
    }

    async fn remove(&self, key: UserKey<'_>) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;

        let sql = format!("DELETE FROM users WHERE {} = ?1", key.column());
        let result = sqlx::query(&sql)
            .bind(key.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Lists users in creation order.
    ///
    /// Each record passes through the same visibility projection as
    /// [`get`](Self::get).
    pub async fn list(&self, limit: i64, offset: i64, reveal_secure: bool) -> DbResult<Page<Record>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY internal_id LIMIT ?1 OFFSET ?2"
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let items = users
            .iter()
            .map(|user| project_visible(&user.to_record(), SECURE_USER_FIELDS, reveal_secure))
            .collect();

        Ok(Page {
            items,
            total: self.count().await?,
            limit,
            offset,
        })
    }

    /// Counts all users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// True iff neither the username nor the email is taken.
    pub async fn credentials_unique(&self, username: &str, email: &str) -> DbResult<bool> {
        let taken: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken == 0)
    }

    /// Whether a user with this external uuid exists.
    pub async fn exists(&self, uuid: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        identity::exists(&mut conn, IdentityScope::USERS, uuid).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
