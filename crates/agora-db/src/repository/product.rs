//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Create with a generated external uuid and a default category
//! - Name uniqueness pre-check
//! - Catalog listing, optionally filtered by category
//! - Whitelisted updates (name, description, category, price)
//!
//! ## Seller Back-Reference
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  users.username ·····················> products.seller                 │
//! │                                                                         │
//! │  • plain TEXT, no foreign key                                          │
//! │  • deleting or renaming the user leaves the product untouched          │
//! │  • never changed by update()                                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Listing Totals
//! `list(.., Some(category))` reports `total` as the number of products in
//! that category, not the size of the whole catalog.

use agora_core::visibility::{project_mutable, MUTABLE_PRODUCT_FIELDS};
use agora_core::{field_text, CategoryCount, Fields, Page, Product, ProductKey, Record, DEFAULT_CATEGORY};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};

use super::{begin_write, required_text, update_text};
use crate::error::DbResult;
use crate::identity::{self, IdentityGenerator, IdentityScope};

const PRODUCT_COLUMNS: &str = "internal_id, external_uuid, name, description, category, price, seller";

/// Fields a new product must supply.
pub const MANDATORY_PRODUCT_FIELDS: &[&str] = &["name", "description", "price"];

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let products = db.products();
///
/// if products.name_unique("wiertarka").await? {
///     let uuid = products.create("konrad", &fields).await?;
/// }
///
/// let tools = products.list(20, 0, Some("Tools")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    ids: IdentityGenerator,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository {
            pool,
            ids: IdentityGenerator::default(),
        }
    }

    /// Creates a product and returns its external uuid.
    ///
    /// ## Arguments
    /// * `seller` - username of the authenticated creator
    /// * `fields` - must contain `name`, `description`, `price`; `category`
    ///   defaults to `"Other"`
    ///
    /// ## Returns
    /// * `Ok(uuid)` - the new product's external identifier
    /// * `Err(DbError::IncompleteData)` - a mandatory field is missing (nothing written)
    /// * `Err(DbError::UniqueViolation)` - name taken (rolled back)
    pub async fn create(&self, seller: &str, fields: &Fields) -> DbResult<String> {
        let name = required_text(fields, "product", "name")?;
        let description = required_text(fields, "product", "description")?;
        let price = required_text(fields, "product", "price")?;
        let category = category_or_default(field_text(fields, "category"));

        debug!(name = %name, seller = %seller, "Creating product");

        let product = Product {
            internal_id: 0,
            external_uuid: String::new(),
            name,
            description,
            category,
            price,
            seller: seller.to_string(),
        };

        let uuid = self.insert(&product).await.map_err(|e| {
            warn!(name = %product.name, error = %e, "Product insert rolled back");
            e.in_operation("product.create", &product.name)
        })?;

        info!(uuid = %uuid, name = %product.name, "Product created");
        Ok(uuid)
    }

    async fn insert(&self, product: &Product) -> DbResult<String> {
        let mut tx = begin_write(&self.pool).await?;

        let uuid = self
            .ids
            .generate_unique_id(&mut tx, IdentityScope::PRODUCTS)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO products (external_uuid, name, description, category, price, seller)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&uuid)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.price)
        .bind(&product.seller)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(uuid)
    }

    /// Gets a product by uuid or name.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn find(&self, key: ProductKey<'_>) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {} = ?1", key.column());

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(key.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product record; empty when no product matches.
    pub async fn get(&self, key: ProductKey<'_>) -> DbResult<Record> {
        debug!(key = ?key, "Getting product");

        Ok(self
            .find(key)
            .await?
            .map(|product| product.to_record())
            .unwrap_or_default())
    }

    /// True iff no product is called `name`.
    pub async fn name_unique(&self, name: &str) -> DbResult<bool> {
        let taken: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE name = ?1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(taken == 0)
    }

    /// Whether a product with this external uuid exists.
    pub async fn exists(&self, uuid: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        identity::exists(&mut conn, IdentityScope::PRODUCTS, uuid).await
    }

    /// Applies the permitted subset of `fields`.
    ///
    /// Only `name`, `description`, `category` and `price` may change;
    /// `seller`, `uuid` and unknown keys are dropped without error, and so
    /// are blank values.
    ///
    /// ## Returns
    /// The applied fields. Empty when nothing was permitted or the product
    /// does not exist.
    pub async fn update(&self, key: ProductKey<'_>, fields: &Fields) -> DbResult<Fields> {
        let permitted = project_mutable(fields, MUTABLE_PRODUCT_FIELDS);

        let mut assignments: Vec<(&'static str, String)> = Vec::new();
        for &name in MUTABLE_PRODUCT_FIELDS {
            let Some(value) = update_text(&permitted, name) else {
                continue;
            };
            assignments.push((name, value));
        }

        if assignments.is_empty() {
            debug!(key = ?key, "No permitted fields to update");
            return Ok(Fields::new());
        }

        debug!(key = ?key, fields = assignments.len(), "Updating product");

        let updated = self
            .apply_update(key, &assignments)
            .await
            .map_err(|e| e.in_operation("product.update", key.value()))?;

        if !updated {
            return Ok(Fields::new());
        }

        Ok(assignments
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value)))
            .collect())
    }

    async fn apply_update(&self, key: ProductKey<'_>, assignments: &[(&'static str, String)]) -> DbResult<bool> {
        let mut tx = begin_write(&self.pool).await?;

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE products SET ");
        {
            let mut set = query.separated(", ");
            for (column, value) in assignments {
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

    /// Deletes a product. Deleting a missing product is a no-op.
    ///
    /// Ledger rows for the product cascade.
    pub async fn delete(&self, key: ProductKey<'_>) -> DbResult<()> {
        let removed = self
            .remove(key)
            .await
            .map_err(|e| e.in_operation("product.delete", key.value()))?;

        debug!(key = ?key, removed, "Deleted product");
        Ok(())
    }

    async fn remove(&self, key: ProductKey<'_>) -> DbResult<u64> {
        let mut tx = begin_write(&self.pool).await?;

        let sql = format!("DELETE FROM products WHERE {} = ?1", key.column());
        let result = sqlx::query(&sql)
            .bind(key.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Lists the catalog in creation order, optionally for one category.
    ///
    /// `total` counts the products matching the filter.
    pub async fn list(&self, limit: i64, offset: i64, category: Option<&str>) -> DbResult<Page<Record>> {
        debug!(limit, offset, category = ?category, "Listing products");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (?1 IS NULL OR category = ?1)
            ORDER BY internal_id
            LIMIT ?2 OFFSET ?3
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: products.iter().map(Product::to_record).collect(),
            total: self.count(category).await?,
            limit,
            offset,
        })
    }

    /// Counts products, optionally in one category.
    pub async fn count(&self, category: Option<&str>) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE (?1 IS NULL OR category = ?1)")
                .bind(category)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Distinct categories with their product counts, by name.
    pub async fn categories(&self) -> DbResult<Vec<CategoryCount>> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS products
            FROM products
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

fn category_or_default(category: Option<String>) -> String {
    category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use serde_json::json;

    fn product_fields(name: &str, description: &str, price: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), json!(name));
        fields.insert("description".into(), json!(description));
        fields.insert("price".into(), json!(price));
        fields
    }

    async fn setup() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let products = db.products();
        (db, products)
    }

    #[tokio::test]
    async fn test_create_defaults_category() {
        let (_db, products) = setup().await;

        let uuid = products
            .create("konrad", &product_fields("wiertarka", "solid drill", "120 PLN"))
            .await
            .unwrap();

        let record = products.get(ProductKey::Uuid(&uuid)).await.unwrap();
        assert_eq!(record["uuid"], uuid.as_str());
        assert_eq!(record["name"], "wiertarka");
        assert_eq!(record["category"], DEFAULT_CATEGORY);
        assert_eq!(record["price"], "120 PLN");
        assert_eq!(record["seller"], "konrad");
        assert!(record.get("internal_id").is_none());
    }

    #[tokio::test]
    async fn test_create_keeps_given_category() {
        let (_db, products) = setup().await;

        let mut fields = product_fields("siekiera", "sharp", "45 PLN");
        fields.insert("category".into(), json!("Tools"));
        products.create("konrad", &fields).await.unwrap();

        let record = products.get(ProductKey::Name("siekiera")).await.unwrap();
        assert_eq!(record["category"], "Tools");
    }

    #[tokio::test]
    async fn test_create_requires_mandatory_fields() {
        let (_db, products) = setup().await;

        for missing in MANDATORY_PRODUCT_FIELDS {
            let mut fields = product_fields("wiertarka", "solid drill", "120 PLN");
            fields.remove(*missing);

            let err = products.create("konrad", &fields).await.unwrap_err();
            assert!(
                matches!(err, DbError::IncompleteData { ref field, .. } if field == *missing),
                "expected IncompleteData for {missing}, got {err:?}"
            );
        }

        assert_eq!(products.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_name_unique() {
        let (_db, products) = setup().await;
        products
            .create("konrad", &product_fields("wiertarka", "solid drill", "120 PLN"))
            .await
            .unwrap();

        assert!(!products.name_unique("wiertarka").await.unwrap());
        assert!(products.name_unique("mlot kowalski").await.unwrap());

        let err = products
            .create("kuba", &product_fields("wiertarka", "another", "99 PLN"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_update_drops_forbidden_keys() {
        let (_db, products) = setup().await;
        let uuid = products
            .create("konrad", &product_fields("wiertarka", "solid drill", "120 PLN"))
            .await
            .unwrap();

        let mut fields = Fields::new();
        fields.insert("price".into(), json!("99 PLN"));
        fields.insert("category".into(), json!("Tools"));
        fields.insert("username".into(), json!("intruder"));
        fields.insert("seller".into(), json!("intruder"));

        let applied = products.update(ProductKey::Uuid(&uuid), &fields).await.unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied["price"], "99 PLN");
        assert_eq!(applied["category"], "Tools");

        let record = products.get(ProductKey::Uuid(&uuid)).await.unwrap();
        assert_eq!(record["price"], "99 PLN");
        assert_eq!(record["category"], "Tools");
        assert_eq!(record["seller"], "konrad");
        assert_eq!(record["name"], "wiertarka");
        assert_eq!(record["description"], "solid drill");
    }

    #[tokio::test]
    async fn test_update_by_name_and_missing_product() {
        let (_db, products) = setup().await;
        products
            .create("konrad", &product_fields("wiertarka", "solid drill", "120 PLN"))
            .await
            .unwrap();

        let mut fields = Fields::new();
        fields.insert("name".into(), json!("wiertarkowkretarka"));
        let applied = products.update(ProductKey::Name("wiertarka"), &fields).await.unwrap();
        assert_eq!(applied["name"], "wiertarkowkretarka");
        assert!(products.get(ProductKey::Name("wiertarka")).await.unwrap().is_empty());

        let applied = products.update(ProductKey::Name("ghost"), &fields).await.unwrap();
        assert!(applied.is_empty());
    }

    #[tokio::test]
    async fn test_update_skips_blank_values() {
        let (_db, products) = setup().await;
        let uuid = products
            .create("konrad", &product_fields("wiertarka", "solid drill", "120 PLN"))
            .await
            .unwrap();

        let mut fields = Fields::new();
        fields.insert("name".into(), json!(""));
        fields.insert("description".into(), json!("   "));
        fields.insert("category".into(), json!(""));
        fields.insert("price".into(), json!("99 PLN"));

        let applied = products.update(ProductKey::Uuid(&uuid), &fields).await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied["price"], "99 PLN");

        let record = products.get(ProductKey::Uuid(&uuid)).await.unwrap();
        assert_eq!(record["name"], "wiertarka");
        assert_eq!(record["description"], "solid drill");
        assert_eq!(record["category"], DEFAULT_CATEGORY);
        assert_eq!(record["price"], "99 PLN");

        let mut blank = Fields::new();
        blank.insert("description".into(), json!(""));
        assert!(products.update(ProductKey::Uuid(&uuid), &blank).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_store_failure_rolls_back() {
        let (db, products) = setup().await;
        let uuid = products
            .create("konrad", &product_fields("wiertarka", "solid drill", "120 PLN"))
            .await
            .unwrap();

        sqlx::query(
            r#"
            CREATE TRIGGER reject_free_products BEFORE UPDATE OF price ON products
            WHEN NEW.price = 'free'
            BEGIN
                SELECT RAISE(ABORT, 'price rejected');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let mut fields = Fields::new();
        fields.insert("name".into(), json!("wiertarka udarowa"));
        fields.insert("price".into(), json!("free"));

        let err = products.update(ProductKey::Uuid(&uuid), &fields).await.unwrap_err();
        match err {
            DbError::Persistence { operation, id, message } => {
                assert_eq!(operation, "product.update");
                assert_eq!(id, uuid);
                assert!(message.contains("price rejected"), "message: {message}");
            }
            other => panic!("expected Persistence, got {other:?}"),
        }

        let record = products.get(ProductKey::Uuid(&uuid)).await.unwrap();
        assert_eq!(record["name"], "wiertarka");
        assert_eq!(record["price"], "120 PLN");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_db, products) = setup().await;
        let uuid = products
            .create("konrad", &product_fields("wiertarka", "solid drill", "120 PLN"))
            .await
            .unwrap();

        products.delete(ProductKey::Uuid(&uuid)).await.unwrap();
        assert!(!products.exists(&uuid).await.unwrap());
        products.delete(ProductKey::Uuid(&uuid)).await.unwrap();
        products.delete(ProductKey::Name("ghost")).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_reports_filtered_total() {
        let (_db, products) = setup().await;
        for (name, category) in [
            ("siekiera", Some("Tools")),
            ("pila mechaniczna", Some("Tools")),
            ("wykalaczka", None),
        ] {
            let mut fields = product_fields(name, "desc", "10 PLN");
            if let Some(category) = category {
                fields.insert("category".into(), json!(category));
            }
            products.create("konrad", &fields).await.unwrap();
        }

        let all = products.list(10, 0, None).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.items.len(), 3);
        assert_eq!(all.items[0]["name"], "siekiera");

        let tools = products.list(1, 1, Some("Tools")).await.unwrap();
        assert_eq!(tools.total, 2);
        assert_eq!(tools.limit, 1);
        assert_eq!(tools.offset, 1);
        assert_eq!(tools.items.len(), 1);
        assert_eq!(tools.items[0]["name"], "pila mechaniczna");

        let none = products.list(10, 0, Some("Garden")).await.unwrap();
        assert_eq!(none.total, 0);
        assert!(none.items.is_empty());
    }

    #[tokio::test]
    async fn test_categories() {
        let (_db, products) = setup().await;
        let mut tools = product_fields("siekiera", "desc", "10 PLN");
        tools.insert("category".into(), json!("Tools"));
        products.create("konrad", &tools).await.unwrap();
        products
            .create("konrad", &product_fields("wykalaczka", "desc", "1 PLN"))
            .await
            .unwrap();

        let categories = products.categories().await.unwrap();
        assert_eq!(
            categories,
            vec![
                CategoryCount { category: "Other".to_string(), products: 1 },
                CategoryCount { category: "Tools".to_string(), products: 1 },
            ]
        );
    }
}
