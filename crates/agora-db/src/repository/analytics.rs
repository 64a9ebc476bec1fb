//! # Sales Analytics
//!
//! Read-only aggregate views over the purchase ledger.
//!
//! ```text
//! purchase_records ──┬── GROUP BY product ── SUM(quantity) ──► top_sellers
//!                    ├── WHERE user = ? ──────────────────────► purchases_for_user
//!                    └── JOIN products WHERE seller = ? ──────► sales_for_seller
//! ```
//!
//! Equal totals are ordered by product internal id, so results are stable.

use agora_core::{PurchasedProduct, SellerSale, TopSeller};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Aggregate queries over the ledger.
#[derive(Debug, Clone)]
pub struct SalesAnalytics {
    pool: SqlitePool,
}

impl SalesAnalytics {
    /// Creates a new SalesAnalytics.
    pub fn new(pool: SqlitePool) -> Self {
        SalesAnalytics { pool }
    }

    /// The `limit` products with the most units sold, best first.
    pub async fn top_sellers(&self, limit: i64) -> DbResult<Vec<TopSeller>> {
        debug!(limit, "Ranking top sellers");

        let sellers = sqlx::query_as::<_, TopSeller>(
            r#"
            SELECT p.name AS product_name,
                   p.external_uuid AS product_uuid,
                   SUM(pr.quantity) AS total_quantity
            FROM purchase_records pr
            INNER JOIN products p ON p.internal_id = pr.product_internal_id
            GROUP BY p.internal_id
            ORDER BY total_quantity DESC, p.internal_id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sellers)
    }

    /// Everything one user has bought, largest quantity first.
    ///
    /// Empty for unknown users and for users with no purchases.
    pub async fn purchases_for_user(&self, user_uuid: &str) -> DbResult<Vec<PurchasedProduct>> {
        let purchases = sqlx::query_as::<_, PurchasedProduct>(
            r#"
            SELECT p.external_uuid AS uuid, p.name, p.description, p.category,
                   p.price, p.seller, pr.quantity
            FROM purchase_records pr
            INNER JOIN users u ON u.internal_id = pr.user_internal_id
            INNER JOIN products p ON p.internal_id = pr.product_internal_id
            WHERE u.external_uuid = ?1
            ORDER BY pr.quantity DESC, p.internal_id ASC
            "#,
        )
        .bind(user_uuid)
        .fetch_all(&self.pool)
        .await?;

        Ok(purchases)
    }

    /// The seller's products that have sold, with units and distinct buyers.
    ///
    /// Products nobody bought are left out.
    pub async fn sales_for_seller(&self, username: &str) -> DbResult<Vec<SellerSale>> {
        let sales = sqlx::query_as::<_, SellerSale>(
            r#"
            SELECT p.external_uuid AS uuid, p.name, p.category, p.price,
                   SUM(pr.quantity) AS total_quantity,
                   COUNT(DISTINCT pr.user_internal_id) AS buyers
            FROM products p
            INNER JOIN purchase_records pr ON pr.product_internal_id = p.internal_id
            WHERE p.seller = ?1
            GROUP BY p.internal_id
            ORDER BY total_quantity DESC, p.internal_id ASC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }
}
