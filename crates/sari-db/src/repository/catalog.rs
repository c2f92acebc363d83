//! # Catalog Repository
//!
//! Product CRUD plus frequency-tier classification.
//!
//! ## Frequency Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 How Frequency Tiers Work                                │
//! │                                                                         │
//! │  Look at the W = 100 most recently confirmed sales.                    │
//! │                                                                         │
//! │  appearances(P) = number of those sales containing at least one        │
//! │                   line item for product P                              │
//! │                                                                         │
//! │  appearances > 80  → FREQUENT   (top of the product grid)              │
//! │  appearances < 20  → SELDOM     (bottom of the product grid)           │
//! │  otherwise         → NORMAL                                            │
//! │                                                                         │
//! │  Cold start: with fewer than 100 sales ever recorded, there is not     │
//! │  enough signal — every product is NORMAL.                              │
//! │                                                                         │
//! │  Listing order: tier rank (FREQUENT, NORMAL, SELDOM), then name.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::{generate_id, now_ms};
use sari_core::validation::{validate_create_product, validate_price, validate_product_name};
use sari_core::{
    CreateProduct, FrequencyTier, Product, ProductWithTier, TimestampMs, UpdateProduct,
    FREQUENCY_WINDOW, FREQUENT_THRESHOLD, SELDOM_THRESHOLD,
};

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Creates a new product. The name is trimmed; `created_at` and
    /// `updated_at` are both stamped with the current instant.
    pub async fn create(&self, payload: CreateProduct) -> DbResult<Product> {
        validate_create_product(&payload)?;

        let now = now_ms();
        let product = Product {
            id: generate_id(),
            name: payload.name.trim().to_string(),
            price_cents: payload.price_cents,
            icon_id: payload.icon_id,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, icon_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(&product.icon_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Updates an existing product, merging only the supplied fields.
    /// `updated_at` is always refreshed, which is what makes the edit
    /// visible to the next sync push.
    pub async fn update(&self, id: &str, payload: UpdateProduct) -> DbResult<Product> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let name = match payload.name {
            Some(name) => {
                validate_product_name(&name)?;
                name.trim().to_string()
            }
            None => existing.name,
        };
        let price_cents = match payload.price_cents {
            Some(price) => {
                validate_price(price)?;
                price
            }
            None => existing.price_cents,
        };
        let icon_id = payload.icon_id.unwrap_or(existing.icon_id);

        let updated = Product {
            id: existing.id,
            name,
            price_cents,
            icon_id,
            created_at: existing.created_at,
            updated_at: now_ms(),
        };

        debug!(id = %updated.id, "Updating product");

        sqlx::query(
            r#"
            UPDATE products SET name = ?2, price_cents = ?3, icon_id = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(&updated.id)
        .bind(&updated.name)
        .bind(updated.price_cents)
        .bind(&updated.icon_id)
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Hard-deletes a product.
    ///
    /// Deletion is refused with InvalidState while historical sale items
    /// reference the product: the ledger's price snapshots must stay
    /// joinable to their product rows. The foreign key constraint backs
    /// this check up at the storage layer.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let references: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE product_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if references > 0 {
            return Err(DbError::invalid_state(
                "Product",
                id,
                format!("referenced by {references} historical sale item(s)"),
            ));
        }

        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a product by its ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price_cents, icon_id, created_at, updated_at
             FROM products WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists every product joined with its computed frequency tier,
    /// ordered by tier rank (FREQUENT, NORMAL, SELDOM) then by name.
    pub async fn list_with_tier(&self) -> DbResult<Vec<ProductWithTier>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price_cents, icon_id, created_at, updated_at
             FROM products ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let total_sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        // Cold start: not enough signal yet, everything is NORMAL.
        let appearances = if total_sales < FREQUENCY_WINDOW {
            HashMap::new()
        } else {
            self.recent_appearances().await?
        };

        let mut with_tiers: Vec<ProductWithTier> = products
            .into_iter()
            .map(|product| {
                let count = appearances.get(&product.id).copied().unwrap_or(0);
                let frequency_tier = if total_sales < FREQUENCY_WINDOW {
                    FrequencyTier::Normal
                } else {
                    classify(count)
                };
                ProductWithTier {
                    product,
                    frequency_tier,
                }
            })
            .collect();

        // Products arrive name-sorted; a stable sort by rank preserves the
        // alphabetical order within each tier.
        with_tiers.sort_by_key(|p| p.frequency_tier.rank());

        Ok(with_tiers)
    }

    /// Counts all products (diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Distinct-sale appearances per product over the FREQUENCY_WINDOW most
    /// recently confirmed sales, in one grouped query.
    async fn recent_appearances(&self) -> DbResult<HashMap<String, i64>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT si.product_id, COUNT(DISTINCT si.sale_id) AS appearances
            FROM sale_items si
            WHERE si.sale_id IN (
                SELECT id FROM sales ORDER BY confirmed_at DESC LIMIT ?1
            )
            GROUP BY si.product_id
            "#,
        )
        .bind(FREQUENCY_WINDOW)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    // =========================================================================
    // Sync Support
    // =========================================================================

    /// Products modified after the watermark (push source).
    pub async fn updated_after(&self, watermark: TimestampMs) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price_cents, icon_id, created_at, updated_at
             FROM products WHERE updated_at > ?1",
        )
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Applies a remote product document with last-writer-wins semantics:
    /// the row is replaced only if the incoming `updated_at` is not older
    /// than the local one. Typed column list — remote payloads never drive
    /// SQL shape.
    pub async fn apply_remote(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, icon_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                price_cents = excluded.price_cents,
                icon_id = excluded.icon_id,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            WHERE excluded.updated_at >= products.updated_at
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(&product.icon_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Tier from an appearance count, once past the cold-start gate.
fn classify(appearances: i64) -> FrequencyTier {
    if appearances > FREQUENT_THRESHOLD {
        FrequencyTier::Frequent
    } else if appearances < SELDOM_THRESHOLD {
        FrequencyTier::Seldom
    } else {
        FrequencyTier::Normal
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use sari_core::Money;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn payload(name: &str, cents: i64) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            price_cents: Money::from_cents(cents),
            icon_id: "icon-can".to_string(),
        }
    }

    /// Inserts a raw sale with `count` line items for the given products.
    async fn insert_sale(db: &Database, sale_id: &str, confirmed_at: i64, product_ids: &[&str]) {
        sqlx::query("INSERT INTO sales (id, payment_method, confirmed_at) VALUES (?1, 'CASH', ?2)")
            .bind(sale_id)
            .bind(confirmed_at)
            .execute(db.pool())
            .await
            .unwrap();

        for product_id in product_ids {
            sqlx::query(
                "INSERT INTO sale_items (id, sale_id, product_id, quantity, price_at_sale_cents, is_borrowed)
                 VALUES (?1, ?2, ?3, 1, 100, 0)",
            )
            .bind(generate_id())
            .bind(sale_id)
            .bind(product_id)
            .execute(db.pool())
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn test_create_trims_name_and_stamps_timestamps() {
        let db = test_db().await;
        let product = db.catalog().create(payload("  Suka 385ml  ", 1800)).await.unwrap();

        assert_eq!(product.name, "Suka 385ml");
        assert_eq!(product.created_at, product.updated_at);

        let fetched = db.catalog().get(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched, product);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let db = test_db().await;

        let err = db.catalog().create(payload("", 100)).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));

        let err = db.catalog().create(payload("Asin", -1)).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_update_merges_partial_fields() {
        let db = test_db().await;
        let product = db.catalog().create(payload("Mantika 1L", 9500)).await.unwrap();

        let updated = db
            .catalog()
            .update(
                &product.id,
                UpdateProduct {
                    price_cents: Some(Money::from_cents(9900)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Only price changed; updated_at refreshed
        assert_eq!(updated.name, "Mantika 1L");
        assert_eq!(updated.price_cents.cents(), 9900);
        assert!(updated.updated_at >= product.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let db = test_db().await;
        let err = db
            .catalog()
            .update("nope", UpdateProduct::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_unreferenced_product() {
        let db = test_db().await;
        let product = db.catalog().create(payload("Posporo", 500)).await.unwrap();

        db.catalog().delete(&product.id).await.unwrap();
        assert!(db.catalog().get(&product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_referenced_product_is_rejected() {
        let db = test_db().await;
        let product = db.catalog().create(payload("Kape 3-in-1", 800)).await.unwrap();
        insert_sale(&db, "s1", 1000, &[&product.id]).await;

        let err = db.catalog().delete(&product.id).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidState { .. }));

        // Still present afterwards
        assert!(db.catalog().get(&product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_product_is_not_found() {
        let db = test_db().await;
        let err = db.catalog().delete("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_cold_start_everything_is_normal() {
        let db = test_db().await;
        let a = db.catalog().create(payload("Asukal 1kg", 6500)).await.unwrap();
        let b = db.catalog().create(payload("Bigas 1kg", 5200)).await.unwrap();

        // 99 sales, all containing product A — still below the window
        for i in 0..99 {
            insert_sale(&db, &format!("s{i}"), i, &[&a.id]).await;
        }

        let listed = db.catalog().list_with_tier().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed
            .iter()
            .all(|p| p.frequency_tier == FrequencyTier::Normal));
        let _ = b;
    }

    #[tokio::test]
    async fn test_tier_worked_example() {
        // 150 total sales; of the most recent 100:
        //   A appears in 85 → FREQUENT, B in 15 → SELDOM, C in 50 → NORMAL
        let db = test_db().await;
        let a = db.catalog().create(payload("Alak", 100)).await.unwrap();
        let b = db.catalog().create(payload("Bawang", 100)).await.unwrap();
        let c = db.catalog().create(payload("Calamansi", 100)).await.unwrap();

        for i in 0..150i64 {
            let mut products: Vec<&str> = Vec::new();
            if i >= 65 {
                products.push(&a.id); // sales 65..150 → 85 in-window
            }
            if i >= 135 {
                products.push(&b.id); // sales 135..150 → 15 in-window
            }
            if i >= 100 {
                products.push(&c.id); // sales 100..150 → 50 in-window
            }
            insert_sale(&db, &format!("s{i}"), i, &products).await;
        }

        let listed = db.catalog().list_with_tier().await.unwrap();
        let tier_of = |id: &str| {
            listed
                .iter()
                .find(|p| p.product.id == id)
                .unwrap()
                .frequency_tier
        };

        assert_eq!(tier_of(&a.id), FrequencyTier::Frequent);
        assert_eq!(tier_of(&b.id), FrequencyTier::Seldom);
        assert_eq!(tier_of(&c.id), FrequencyTier::Normal);

        // Listing order: tier rank ascending
        assert_eq!(listed[0].product.id, a.id);
        assert_eq!(listed[1].product.id, c.id);
        assert_eq!(listed[2].product.id, b.id);
    }

    #[tokio::test]
    async fn test_apply_remote_last_writer_wins() {
        let db = test_db().await;
        let local = db.catalog().create(payload("Itlog", 900)).await.unwrap();

        // Older remote document must not clobber the newer local row
        let stale = Product {
            name: "Itlog (stale)".to_string(),
            updated_at: local.updated_at - 1000,
            ..local.clone()
        };
        db.catalog().apply_remote(&stale).await.unwrap();
        assert_eq!(db.catalog().get(&local.id).await.unwrap().unwrap().name, "Itlog");

        // Newer remote document wins wholesale
        let newer = Product {
            name: "Itlog Pula".to_string(),
            updated_at: local.updated_at + 1000,
            ..local.clone()
        };
        db.catalog().apply_remote(&newer).await.unwrap();
        let row = db.catalog().get(&local.id).await.unwrap().unwrap();
        assert_eq!(row.name, "Itlog Pula");
        assert_eq!(row.updated_at, newer.updated_at);
    }
}
