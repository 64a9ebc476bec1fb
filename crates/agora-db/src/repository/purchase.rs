//! # Purchase Ledger
//!
//! Tracks, per (user, product) pair, how many units the user has bought.
//!
//! ## Accumulating Upsert
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  buy(quantity, user_uuid, product_uuid)                                 │
//! │                                                                         │
//! │  BEGIN IMMEDIATE                                                       │
//! │    resolve user_uuid    → users.internal_id     (none → UserNotFound)  │
//! │    resolve product_uuid → products.internal_id  (none → ProductNotFound)│
//! │    INSERT INTO purchase_records ...                                    │
//! │      ON CONFLICT(user_internal_id, product_internal_id)                │
//! │      DO UPDATE SET quantity = quantity + excluded.quantity             │
//! │      RETURNING quantity                                                │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  buy(10, U, P); buy(2, U, P)  →  one row, quantity 12                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The increment is a single statement, so two concurrent buys of the same
//! pair can never both insert. The UNIQUE(user, product) constraint holds
//! the one-row-per-pair invariant at the store level as well. The
//! transaction takes the write lock before resolving ids, so concurrent
//! buys on a multi-connection pool wait for each other instead of failing
//! with "database is locked".

use agora_core::{BuyOutcome, PurchaseRecord};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::begin_write;
use crate::error::DbResult;

/// Repository for the purchase ledger.
#[derive(Debug, Clone)]
pub struct PurchaseLedger {
    pool: SqlitePool,
}

impl PurchaseLedger {
    /// Creates a new PurchaseLedger.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseLedger { pool }
    }

    /// Records that `user_uuid` bought `quantity` units of `product_uuid`.
    ///
    /// Unknown users or products are reported in the outcome; nothing is
    /// written for them.
    pub async fn buy(&self, quantity: u32, user_uuid: &str, product_uuid: &str) -> DbResult<BuyOutcome> {
        debug!(quantity, user = %user_uuid, product = %product_uuid, "Recording purchase");

        let outcome = self
            .accumulate(quantity, user_uuid, product_uuid)
            .await
            .map_err(|e| e.in_operation("purchase.buy", &format!("{user_uuid}/{product_uuid}")))?;

        match outcome {
            BuyOutcome::Recorded { total_quantity } => {
                info!(user = %user_uuid, product = %product_uuid, quantity, total_quantity, "Purchase recorded");
            }
            BuyOutcome::UserNotFound | BuyOutcome::ProductNotFound => {
                debug!(user = %user_uuid, product = %product_uuid, ?outcome, "Purchase skipped");
            }
        }

        Ok(outcome)
    }

    async fn accumulate(&self, quantity: u32, user_uuid: &str, product_uuid: &str) -> DbResult<BuyOutcome> {
        let mut tx = begin_write(&self.pool).await?;

        let Some(user_id) = internal_id(&mut tx, "users", user_uuid).await? else {
            return Ok(BuyOutcome::UserNotFound);
        };
        let Some(product_id) = internal_id(&mut tx, "products", product_uuid).await? else {
            return Ok(BuyOutcome::ProductNotFound);
        };

        let total_quantity: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO purchase_records (quantity, user_internal_id, product_internal_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_internal_id, product_internal_id)
            DO UPDATE SET quantity = quantity + excluded.quantity
            RETURNING quantity
            "#,
        )
        .bind(i64::from(quantity))
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BuyOutcome::Recorded { total_quantity })
    }

    /// Returns the ledger row id for the pair, if the user has bought the
    /// product.
    pub async fn find_record(&self, user_uuid: &str, product_uuid: &str) -> DbResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT pr.internal_id
            FROM users u
            INNER JOIN purchase_records pr ON pr.user_internal_id = u.internal_id
            INNER JOIN products p ON p.internal_id = pr.product_internal_id
            WHERE u.external_uuid = ?1 AND p.external_uuid = ?2
            "#,
        )
        .bind(user_uuid)
        .bind(product_uuid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Returns the full ledger row for the pair.
    pub async fn get_record(&self, user_uuid: &str, product_uuid: &str) -> DbResult<Option<PurchaseRecord>> {
        let record = sqlx::query_as::<_, PurchaseRecord>(
            r#"
            SELECT pr.internal_id, pr.quantity, pr.user_internal_id, pr.product_internal_id
            FROM purchase_records pr
            INNER JOIN users u ON u.internal_id = pr.user_internal_id
            INNER JOIN products p ON p.internal_id = pr.product_internal_id
            WHERE u.external_uuid = ?1 AND p.external_uuid = ?2
            "#,
        )
        .bind(user_uuid)
        .bind(product_uuid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}

async fn internal_id(conn: &mut SqliteConnection, table: &'static str, uuid: &str) -> DbResult<Option<i64>> {
    let sql = format!("SELECT internal_id FROM {table} WHERE external_uuid = ?1");

    let id = sqlx::query_scalar::<_, i64>(&sql)
        .bind(uuid)
        .fetch_optional(conn)
        .await?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use agora_core::{Fields, HashingCost, ProductKey, UserKey};
    use serde_json::json;

    const UNKNOWN: &str = "00000000-0000-4000-8000-000000000000";

    async fn setup() -> (Database, String, String) {
        seed(Database::new(DbConfig::in_memory()).await.unwrap()).await
    }

    async fn seed(db: Database) -> (Database, String, String) {
        let mut user = Fields::new();
        user.insert("username".into(), json!("kupiec"));
        user.insert("password".into(), json!("sekret"));
        user.insert("email".into(), json!("kupiec@example.com"));
        let user_uuid = db.users().create(&user).await.unwrap();

        let mut product = Fields::new();
        product.insert("name".into(), json!("mlotek"));
        product.insert("description".into(), json!("steel hammer"));
        product.insert("price".into(), json!("30 PLN"));
        let product_uuid = db.products().create("sprzedawca", &product).await.unwrap();

        (db, user_uuid, product_uuid)
    }

    async fn ledger_rows(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM purchase_records")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_buy_accumulates_into_one_row() {
        let (db, user, product) = setup().await;
        let ledger = db.ledger();

        assert_eq!(ledger.find_record(&user, &product).await.unwrap(), None);

        let first = ledger.buy(10, &user, &product).await.unwrap();
        assert_eq!(first, BuyOutcome::Recorded { total_quantity: 10 });
        let row_id = ledger.find_record(&user, &product).await.unwrap();
        assert!(row_id.is_some());

        let second = ledger.buy(2, &user, &product).await.unwrap();
        assert_eq!(second, BuyOutcome::Recorded { total_quantity: 12 });

        assert_eq!(ledger_rows(&db).await, 1);
        assert_eq!(ledger.find_record(&user, &product).await.unwrap(), row_id);

        let record = ledger.get_record(&user, &product).await.unwrap().unwrap();
        assert_eq!(record.quantity, 12);
        assert_eq!(Some(record.internal_id), row_id);
    }

    #[tokio::test]
    async fn test_buy_with_unknown_refs_is_noop() {
        let (db, user, product) = setup().await;
        let ledger = db.ledger();

        let outcome = ledger.buy(5, UNKNOWN, &product).await.unwrap();
        assert_eq!(outcome, BuyOutcome::UserNotFound);
        assert!(!outcome.is_recorded());

        let outcome = ledger.buy(5, &user, UNKNOWN).await.unwrap();
        assert_eq!(outcome, BuyOutcome::ProductNotFound);

        assert_eq!(ledger_rows(&db).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_buys_sum() {
        let (db, user, product) = setup().await;
        let ledger = db.ledger();

        let buys = (1..=5u32).map(|q| {
            let ledger = ledger.clone();
            let user = user.clone();
            let product = product.clone();
            tokio::spawn(async move { ledger.buy(q, &user, &product).await })
        });
        for handle in buys.collect::<Vec<_>>() {
            assert!(handle.await.unwrap().unwrap().is_recorded());
        }

        assert_eq!(ledger_rows(&db).await, 1);
        let record = ledger.get_record(&user, &product).await.unwrap().unwrap();
        assert_eq!(record.quantity, 15);
    }

    #[tokio::test]
    async fn test_rows_cascade_on_delete() {
        let (db, user, product) = setup().await;
        let ledger = db.ledger();
        ledger.buy(3, &user, &product).await.unwrap();

        db.products().delete(ProductKey::Uuid(&product)).await.unwrap();
        assert_eq!(ledger_rows(&db).await, 0);

        let mut other = Fields::new();
        other.insert("name".into(), json!("obcegi"));
        other.insert("description".into(), json!("pliers"));
        other.insert("price".into(), json!("25 PLN"));
        let other = db.products().create("sprzedawca", &other).await.unwrap();
        ledger.buy(1, &user, &other).await.unwrap();

        db.users().delete(UserKey::Uuid(&user)).await.unwrap();
        assert_eq!(ledger_rows(&db).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_buys_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("ledger.db"))
            .max_connections(8)
            .secret_key("ledger-test-secret")
            .hashing_cost(HashingCost::light());
        let (db, user, product) = seed(Database::new(config).await.unwrap()).await;
        let ledger = db.ledger();

        let buys: Vec<_> = (0..40)
            .map(|_| {
                let ledger = ledger.clone();
                let user = user.clone();
                let product = product.clone();
                tokio::spawn(async move { ledger.buy(1, &user, &product).await })
            })
            .collect();
        for handle in buys {
            let outcome = handle.await.unwrap().unwrap();
            assert!(outcome.is_recorded(), "got {outcome:?}");
        }

        assert_eq!(ledger_rows(&db).await, 1);
        let record = ledger.get_record(&user, &product).await.unwrap().unwrap();
        assert_eq!(record.quantity, 40);

        db.close().await;
    }

    #[tokio::test]
    async fn test_buy_store_failure_writes_nothing() {
        let (db, user, product) = setup().await;
        sqlx::query(
            r#"
            CREATE TRIGGER cap_quantity BEFORE INSERT ON purchase_records
            WHEN NEW.quantity > 100
            BEGIN
                SELECT RAISE(ABORT, 'quantity over limit');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let err = db.ledger().buy(500, &user, &product).await.unwrap_err();
        assert!(
            matches!(err, DbError::Persistence { ref operation, .. } if operation == "purchase.buy"),
            "got {err:?}"
        );
        assert_eq!(ledger_rows(&db).await, 0);
    }
}
