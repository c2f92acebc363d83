//! # Ledger Repository
//!
//! The transactional heart of the store: sale confirmation, borrows and
//! repayments. Every mutation here runs inside a single SQLite transaction
//! so the ledger is always in a consistent state.
//!
//! ## Confirm-Sale Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    confirm_sale(payload)                                │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── INSERT sale (payment_method, confirmed_at = now)                 │
//! │    │                                                                    │
//! │    ├── for each line:                                                   │
//! │    │     look up product → snapshot its CURRENT price                   │
//! │    │     INSERT sale_item (price_at_sale frozen forever)                │
//! │    │                                                                    │
//! │    ├── if BORROW or PARTIAL:                                            │
//! │    │     borrowed_total = Σ line totals where is_borrowed               │
//! │    │     find-or-create borrower (name, case-insensitive)               │
//! │    │     INSERT borrow (total = outstanding = borrowed_total, ACTIVE)   │
//! │    │                                                                    │
//! │  COMMIT ← any failure above rolls the whole sale back                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Accounting Invariant
//! For every borrow: `outstanding = total − Σ payments`, never negative,
//! and `status = RESOLVED` exactly when outstanding is zero. record_payment
//! maintains this by inserting the payment and updating the borrow in the
//! same transaction.

use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::{generate_id, now_ms};
use sari_core::validation::{validate_confirm_sale, validate_payment_amount};
use sari_core::{
    Borrow, BorrowPayment, BorrowStatus, BorrowWithDetails, Borrower, ConfirmSale, Money, Product,
    Sale, SaleItem, SaleItemWithProduct, SaleWithItems, TimestampMs,
};

/// Repository for sales, borrows and payments.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Confirms a sale atomically: the sale row, all line items with frozen
    /// price snapshots, and (for credit sales) the borrower and borrow row
    /// commit together or not at all.
    ///
    /// Referencing an unknown product fails the whole sale with NotFound.
    pub async fn confirm_sale(&self, payload: ConfirmSale) -> DbResult<Sale> {
        validate_confirm_sale(&payload)?;

        let now = now_ms();
        let sale = Sale {
            id: generate_id(),
            payment_method: payload.payment_method,
            confirmed_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO sales (id, payment_method, confirmed_at) VALUES (?1, ?2, ?3)")
            .bind(&sale.id)
            .bind(sale.payment_method)
            .bind(sale.confirmed_at)
            .execute(&mut *tx)
            .await?;

        let mut borrowed_total = Money::zero();

        for line in &payload.items {
            // Snapshot the product's price as of this instant. Later price
            // edits must never change this sale's total.
            let product = sqlx::query_as::<_, Product>(
                "SELECT id, name, price_cents, icon_id, created_at, updated_at
                 FROM products WHERE id = ?1",
            )
            .bind(&line.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &line.product_id))?;

            sqlx::query(
                r#"
                INSERT INTO sale_items (id, sale_id, product_id, quantity, price_at_sale_cents, is_borrowed)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(generate_id())
            .bind(&sale.id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(product.price_cents)
            .bind(line.is_borrowed)
            .execute(&mut *tx)
            .await?;

            if line.is_borrowed {
                borrowed_total += product.price_cents.multiply_quantity(line.quantity);
            }
        }

        if sale.payment_method.is_credit() {
            // Validation guarantees the name is present and non-blank.
            let name = payload.borrower_name.as_deref().unwrap_or_default().trim();

            if !borrowed_total.is_positive() {
                return Err(DbError::InvalidArgument(
                    "credit sale has a zero borrowed total".to_string(),
                ));
            }

            let borrower = find_or_create_borrower(&mut tx, name, now).await?;

            sqlx::query(
                r#"
                INSERT INTO borrows
                    (id, borrower_id, sale_id, total_amount_cents,
                     outstanding_balance_cents, status, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4, 'ACTIVE', ?5, ?5)
                "#,
            )
            .bind(generate_id())
            .bind(&borrower.id)
            .bind(&sale.id)
            .bind(borrowed_total)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            debug!(
                sale_id = %sale.id,
                borrower = %borrower.name,
                amount = %borrowed_total,
                "Borrow opened for credit sale"
            );
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            method = ?sale.payment_method,
            items = payload.items.len(),
            "Sale confirmed"
        );

        Ok(sale)
    }

    /// Records a repayment against a borrow, returning the updated borrow
    /// and the payment row.
    ///
    /// The payment row and the borrow's new balance commit together. The
    /// balance reaches exactly zero or stays positive; overpayment is
    /// rejected before anything is written, as is paying into a borrow
    /// that is already RESOLVED.
    pub async fn record_payment(
        &self,
        borrow_id: &str,
        amount: Money,
    ) -> DbResult<(Borrow, BorrowPayment)> {
        validate_payment_amount(amount)?;

        let mut tx = self.pool.begin().await?;

        let borrow = fetch_borrow(&mut tx, borrow_id)
            .await?
            .ok_or_else(|| DbError::not_found("Borrow", borrow_id))?;

        if borrow.is_resolved() {
            return Err(DbError::invalid_state(
                "Borrow",
                borrow_id,
                "already resolved",
            ));
        }

        if amount > borrow.outstanding_balance_cents {
            return Err(DbError::InvalidArgument(format!(
                "payment {amount} exceeds outstanding balance {}",
                borrow.outstanding_balance_cents
            )));
        }

        let now = now_ms();
        let new_balance = borrow.outstanding_balance_cents - amount;
        let new_status = if new_balance.is_zero() {
            BorrowStatus::Resolved
        } else {
            BorrowStatus::Active
        };

        let payment = BorrowPayment {
            id: generate_id(),
            borrow_id: borrow_id.to_string(),
            amount_cents: amount,
            paid_at: now,
        };

        sqlx::query(
            "INSERT INTO borrow_payments (id, borrow_id, amount_cents, paid_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&payment.id)
        .bind(&payment.borrow_id)
        .bind(payment.amount_cents)
        .bind(payment.paid_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE borrows
             SET outstanding_balance_cents = ?2, status = ?3, updated_at = ?4
             WHERE id = ?1",
        )
        .bind(borrow_id)
        .bind(new_balance)
        .bind(new_status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            borrow_id = %borrow_id,
            amount = %amount,
            remaining = %new_balance,
            resolved = new_balance.is_zero(),
            "Payment recorded"
        );

        Ok((
            Borrow {
                outstanding_balance_cents: new_balance,
                status: new_status,
                updated_at: now,
                ..borrow
            },
            payment,
        ))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Total number of confirmed sales ever recorded (also the frequency
    /// tier cold-start gate).
    pub async fn total_sale_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The ids of the `limit` most recently confirmed sales, newest first.
    /// This is the frequency-tier window when called with the window size.
    pub async fn recent_sale_ids(&self, limit: i64) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM sales ORDER BY confirmed_at DESC, id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// One page of the sales log, newest first. `page` is zero-based.
    pub async fn sales_log(&self, page: i64, page_size: i64) -> DbResult<Vec<SaleWithItems>> {
        if page < 0 || page_size <= 0 {
            return Err(DbError::InvalidArgument(
                "page must be >= 0 and page_size >= 1".to_string(),
            ));
        }

        let sales = sqlx::query_as::<_, Sale>(
            "SELECT id, payment_method, confirmed_at FROM sales
             ORDER BY confirmed_at DESC, id DESC
             LIMIT ?1 OFFSET ?2",
        )
        .bind(page_size)
        .bind(page * page_size)
        .fetch_all(&self.pool)
        .await?;

        let mut log = Vec::with_capacity(sales.len());
        let mut product_cache: HashMap<String, Product> = HashMap::new();
        for sale in sales {
            log.push(self.join_sale(sale, &mut product_cache).await?);
        }

        Ok(log)
    }

    /// A single sale with its line items and their products.
    pub async fn sale_by_id(&self, id: &str) -> DbResult<Option<SaleWithItems>> {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT id, payment_method, confirmed_at FROM sales WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match sale {
            Some(sale) => {
                let mut cache = HashMap::new();
                Ok(Some(self.join_sale(sale, &mut cache).await?))
            }
            None => Ok(None),
        }
    }

    /// All borrowers, alphabetical (the name column collates NOCASE).
    pub async fn borrowers(&self) -> DbResult<Vec<Borrower>> {
        let borrowers = sqlx::query_as::<_, Borrower>(
            "SELECT id, name, created_at FROM borrowers ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(borrowers)
    }

    /// A borrower's borrows, newest first.
    pub async fn borrows_for_borrower(&self, borrower_id: &str) -> DbResult<Vec<Borrow>> {
        let borrows = sqlx::query_as::<_, Borrow>(
            "SELECT id, borrower_id, sale_id, total_amount_cents,
                    outstanding_balance_cents, status, created_at, updated_at
             FROM borrows WHERE borrower_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(borrows)
    }

    /// A borrow with its borrower, originating sale and full payment
    /// history. A borrow whose parents are missing means the ledger itself
    /// is damaged, reported as Inconsistent rather than NotFound.
    pub async fn borrow_by_id(&self, id: &str) -> DbResult<Option<BorrowWithDetails>> {
        let borrow = sqlx::query_as::<_, Borrow>(
            "SELECT id, borrower_id, sale_id, total_amount_cents,
                    outstanding_balance_cents, status, created_at, updated_at
             FROM borrows WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(borrow) = borrow else {
            return Ok(None);
        };

        let borrower = sqlx::query_as::<_, Borrower>(
            "SELECT id, name, created_at FROM borrowers WHERE id = ?1",
        )
        .bind(&borrow.borrower_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            DbError::Inconsistent(format!(
                "borrow {id} references missing borrower {}",
                borrow.borrower_id
            ))
        })?;

        let sale = self.sale_by_id(&borrow.sale_id).await?.ok_or_else(|| {
            DbError::Inconsistent(format!(
                "borrow {id} references missing sale {}",
                borrow.sale_id
            ))
        })?;

        let payments = sqlx::query_as::<_, BorrowPayment>(
            "SELECT id, borrow_id, amount_cents, paid_at
             FROM borrow_payments WHERE borrow_id = ?1
             ORDER BY paid_at ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(BorrowWithDetails {
            borrow,
            borrower,
            sale,
            payments,
        }))
    }

    /// Joins a sale's line items with their products; a line whose product
    /// row is gone is a damaged ledger (deletion of referenced products is
    /// refused, and sync never removes rows).
    async fn join_sale(
        &self,
        sale: Sale,
        product_cache: &mut HashMap<String, Product>,
    ) -> DbResult<SaleWithItems> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, quantity, price_at_sale_cents, is_borrowed
             FROM sale_items WHERE sale_id = ?1
             ORDER BY id ASC",
        )
        .bind(&sale.id)
        .fetch_all(&self.pool)
        .await?;

        let mut joined = Vec::with_capacity(items.len());
        let mut total = Money::zero();

        for item in items {
            let product = match product_cache.get(&item.product_id) {
                Some(product) => product.clone(),
                None => {
                    let product = sqlx::query_as::<_, Product>(
                        "SELECT id, name, price_cents, icon_id, created_at, updated_at
                         FROM products WHERE id = ?1",
                    )
                    .bind(&item.product_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| {
                        DbError::Inconsistent(format!(
                            "sale item {} references missing product {}",
                            item.id, item.product_id
                        ))
                    })?;
                    product_cache.insert(item.product_id.clone(), product.clone());
                    product
                }
            };

            total += item.line_total();
            joined.push(SaleItemWithProduct { item, product });
        }

        Ok(SaleWithItems {
            sale,
            items: joined,
            total,
        })
    }

    // =========================================================================
    // Sync Support
    // =========================================================================

    /// Borrowers created after the watermark. Borrowers are create-only, so
    /// `created_at` is their change timestamp.
    pub async fn borrowers_created_after(
        &self,
        watermark: TimestampMs,
    ) -> DbResult<Vec<Borrower>> {
        let borrowers = sqlx::query_as::<_, Borrower>(
            "SELECT id, name, created_at FROM borrowers WHERE created_at > ?1",
        )
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;
        Ok(borrowers)
    }

    /// Borrows modified after the watermark (new borrows and repaid ones).
    pub async fn borrows_updated_after(&self, watermark: TimestampMs) -> DbResult<Vec<Borrow>> {
        let borrows = sqlx::query_as::<_, Borrow>(
            "SELECT id, borrower_id, sale_id, total_amount_cents,
                    outstanding_balance_cents, status, created_at, updated_at
             FROM borrows WHERE updated_at > ?1",
        )
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;
        Ok(borrows)
    }

    /// Sales confirmed after the watermark.
    pub async fn sales_confirmed_after(&self, watermark: TimestampMs) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT id, payment_method, confirmed_at FROM sales WHERE confirmed_at > ?1",
        )
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    /// Line items of sales confirmed after the watermark. Items have no
    /// timestamp of their own; they travel with their parent sale.
    pub async fn sale_items_confirmed_after(
        &self,
        watermark: TimestampMs,
    ) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT si.id, si.sale_id, si.product_id, si.quantity,
                    si.price_at_sale_cents, si.is_borrowed
             FROM sale_items si
             JOIN sales s ON s.id = si.sale_id
             WHERE s.confirmed_at > ?1",
        )
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Payments recorded after the watermark.
    pub async fn payments_paid_after(
        &self,
        watermark: TimestampMs,
    ) -> DbResult<Vec<BorrowPayment>> {
        let payments = sqlx::query_as::<_, BorrowPayment>(
            "SELECT id, borrow_id, amount_cents, paid_at
             FROM borrow_payments WHERE paid_at > ?1",
        )
        .bind(watermark)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Applies a remote borrower document. Borrowers are create-only and
    /// never renamed, so an existing row (by id OR by unique name) is left
    /// untouched.
    pub async fn apply_remote_borrower(&self, borrower: &Borrower) -> DbResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO borrowers (id, name, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&borrower.id)
        .bind(&borrower.name)
        .bind(borrower.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Applies a remote borrow document with last-writer-wins semantics:
    /// only a row with an older `updated_at` is replaced. The parent
    /// borrower must already be applied (remote applies borrowers first).
    pub async fn apply_remote_borrow(&self, borrow: &Borrow) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO borrows
                (id, borrower_id, sale_id, total_amount_cents,
                 outstanding_balance_cents, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                outstanding_balance_cents = excluded.outstanding_balance_cents,
                status = excluded.status,
                updated_at = excluded.updated_at
            WHERE excluded.updated_at >= borrows.updated_at
            "#,
        )
        .bind(&borrow.id)
        .bind(&borrow.borrower_id)
        .bind(&borrow.sale_id)
        .bind(borrow.total_amount_cents)
        .bind(borrow.outstanding_balance_cents)
        .bind(borrow.status)
        .bind(borrow.created_at)
        .bind(borrow.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Looks up a borrower by name (case-insensitive via the column collation)
/// inside the caller's transaction, creating one if absent.
async fn find_or_create_borrower(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    now: TimestampMs,
) -> DbResult<Borrower> {
    let existing = sqlx::query_as::<_, Borrower>(
        "SELECT id, name, created_at FROM borrowers WHERE name = ?1",
    )
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(borrower) = existing {
        return Ok(borrower);
    }

    let borrower = Borrower {
        id: generate_id(),
        name: name.to_string(),
        created_at: now,
    };

    sqlx::query("INSERT INTO borrowers (id, name, created_at) VALUES (?1, ?2, ?3)")
        .bind(&borrower.id)
        .bind(&borrower.name)
        .bind(borrower.created_at)
        .execute(&mut **tx)
        .await?;

    debug!(name = %borrower.name, "Borrower created");
    Ok(borrower)
}

async fn fetch_borrow(tx: &mut Transaction<'_, Sqlite>, id: &str) -> DbResult<Option<Borrow>> {
    let borrow = sqlx::query_as::<_, Borrow>(
        "SELECT id, borrower_id, sale_id, total_amount_cents,
                outstanding_balance_cents, status, created_at, updated_at
         FROM borrows WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(borrow)
}

// =============================================================================
// Unit Tests
// =============================================================================
