//! # Sync Engine
//!
//! Watermark-based push/pull between the local ledger and the shared
//! remote document store.
//!
//! ## Push (background trigger)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           try_push                                      │
//! │                                                                         │
//! │  1. load watermark (0 = never synced)                                  │
//! │  2. started_at = now      ← captured BEFORE scanning, so rows written  │
//! │                             during the push land after the new         │
//! │                             watermark and are retried next time        │
//! │  3. scan each table for rows changed after the watermark               │
//! │  4. upsert every batch to the remote store                             │
//! │  5. ALL succeeded? → save watermark = started_at                       │
//! │     anything failed? → watermark untouched, whole window retries       │
//! │                                                                         │
//! │  Re-pushing rows is harmless: every remote write is an upsert keyed    │
//! │  by id. Losing a push costs nothing but a retry; advancing the         │
//! │  watermark past unpushed rows would lose data, so only full success    │
//! │  advances it.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pull (foreground trigger)
//! Downloads the MUTABLE collections (products, borrowers, borrows) and
//! applies them with last-writer-wins guards; local rows win ties.
//! Immutable rows (sales, items, payments) are not pulled in this protocol
//! revision, so each device's sales log stays its own. Pull never touches
//! the watermark; that timestamp tracks pushes only.

use std::sync::Arc;
use tracing::{debug, info, warn};

use sari_db::{Database, DbError};

use crate::error::SyncResult;
use crate::remote::RemoteStore;
use crate::watermark::WatermarkStore;
use sari_core::TimestampMs;

// =============================================================================
// Reports
// =============================================================================

/// Row counts uploaded by one successful push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushReport {
    pub products: usize,
    pub borrowers: usize,
    pub borrows: usize,
    pub sales: usize,
    pub sale_items: usize,
    pub payments: usize,
    /// The watermark durably saved by this push.
    pub watermark: TimestampMs,
}

impl PushReport {
    /// Total rows uploaded.
    pub fn total(&self) -> usize {
        self.products + self.borrowers + self.borrows + self.sales + self.sale_items + self.payments
    }
}

/// Row counts applied by one pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PullReport {
    pub products: usize,
    pub borrowers: usize,
    pub borrows: usize,
    /// Remote borrows whose originating sale this device has never seen.
    /// Their details couldn't be rendered locally anyway; they stay remote
    /// until a protocol revision replicates the immutable tables.
    pub skipped_borrows: usize,
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Reconciles the local ledger with the shared remote store.
///
/// Cheap to construct; apps typically build one at startup and call the
/// lifecycle entry points from their background/foreground hooks.
pub struct SyncEngine {
    db: Database,
    remote: Arc<dyn RemoteStore>,
    watermark: Arc<dyn WatermarkStore>,
}

impl SyncEngine {
    /// Creates a new sync engine.
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteStore>,
        watermark: Arc<dyn WatermarkStore>,
    ) -> Self {
        SyncEngine {
            db,
            remote,
            watermark,
        }
    }

    // =========================================================================
    // Lifecycle Entry Points (never fail)
    // =========================================================================

    /// Background trigger: push local changes. Failures are logged and
    /// swallowed; the ledger is the source of truth and the next trigger
    /// retries the whole window.
    pub async fn on_background(&self) {
        match self.try_push().await {
            Ok(report) if report.total() > 0 => {
                info!(
                    pushed = report.total(),
                    watermark = report.watermark,
                    "Background push complete"
                );
            }
            Ok(_) => debug!("Background push: nothing to do"),
            Err(e) => warn!(error = %e, retryable = e.is_retryable(), "Background push failed"),
        }
    }

    /// Foreground trigger: pull remote changes. Failures are logged and
    /// swallowed; the app keeps working on local data.
    pub async fn on_foreground(&self) {
        match self.try_pull().await {
            Ok(report) => {
                debug!(
                    products = report.products,
                    borrowers = report.borrowers,
                    borrows = report.borrows,
                    skipped = report.skipped_borrows,
                    "Foreground pull complete"
                );
            }
            Err(e) => warn!(error = %e, retryable = e.is_retryable(), "Foreground pull failed"),
        }
    }

    // =========================================================================
    // Fallible Operations
    // =========================================================================

    /// Pushes every local row changed since the watermark, then advances
    /// the watermark. All-or-nothing: any failure leaves the watermark
    /// where it was.
    pub async fn try_push(&self) -> SyncResult<PushReport> {
        let since = self.watermark.load().await?.unwrap_or(0);
        let started_at = sari_db::now_ms();

        let catalog = self.db.catalog();
        let ledger = self.db.ledger();

        let products = catalog.updated_after(since).await?;
        let borrowers = ledger.borrowers_created_after(since).await?;
        let borrows = ledger.borrows_updated_after(since).await?;
        let sales = ledger.sales_confirmed_after(since).await?;
        let sale_items = ledger.sale_items_confirmed_after(since).await?;
        let payments = ledger.payments_paid_after(since).await?;

        let report = PushReport {
            products: products.len(),
            borrowers: borrowers.len(),
            borrows: borrows.len(),
            sales: sales.len(),
            sale_items: sale_items.len(),
            payments: payments.len(),
            watermark: started_at,
        };

        debug!(since, pending = report.total(), "Push window scanned");

        if !products.is_empty() {
            self.remote.upsert_products(&products).await?;
        }
        if !borrowers.is_empty() {
            self.remote.upsert_borrowers(&borrowers).await?;
        }
        if !sales.is_empty() {
            self.remote.put_sales(&sales).await?;
        }
        if !sale_items.is_empty() {
            self.remote.put_sale_items(&sale_items).await?;
        }
        if !borrows.is_empty() {
            self.remote.upsert_borrows(&borrows).await?;
        }
        if !payments.is_empty() {
            self.remote.put_borrow_payments(&payments).await?;
        }

        self.watermark.save(started_at).await?;

        Ok(report)
    }

    /// Pulls the mutable collections changed since the watermark and
    /// applies them under last-writer-wins guards. Does not advance the
    /// watermark.
    pub async fn try_pull(&self) -> SyncResult<PullReport> {
        let since = self.watermark.load().await?.unwrap_or(0);

        let catalog = self.db.catalog();
        let ledger = self.db.ledger();

        let mut report = PullReport::default();

        // Borrowers before borrows: borrows reference them.
        for borrower in self.remote.borrowers_changed_since(since).await? {
            ledger.apply_remote_borrower(&borrower).await?;
            report.borrowers += 1;
        }

        for product in self.remote.products_changed_since(since).await? {
            catalog.apply_remote(&product).await?;
            report.products += 1;
        }

        for borrow in self.remote.borrows_changed_since(since).await? {
            match ledger.apply_remote_borrow(&borrow).await {
                Ok(()) => report.borrows += 1,
                Err(DbError::ForeignKeyViolation { .. }) => {
                    // Another device's borrow; its sale was never replicated
                    warn!(borrow_id = %borrow.id, "Skipping borrow with unknown parent sale");
                    report.skipped_borrows += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }
}

// =============================================================================
// Integration Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRemote;
    use crate::watermark::MemoryWatermarkStore;
    use sari_core::{ConfirmSale, CreateProduct, Money, PaymentMethod, SaleLine, UpdateProduct};
    use sari_db::DbConfig;

    struct Device {
        db: Database,
        engine: SyncEngine,
        watermark: Arc<MemoryWatermarkStore>,
    }

    async fn device(remote: &Arc<MemoryRemote>) -> Device {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let watermark = Arc::new(MemoryWatermarkStore::new());
        let remote: Arc<dyn RemoteStore> = remote.clone();
        let watermark_store: Arc<dyn WatermarkStore> = watermark.clone();
        let engine = SyncEngine::new(db.clone(), remote, watermark_store);
        Device {
            db,
            engine,
            watermark,
        }
    }

    async fn add_product(db: &Database, name: &str, cents: i64) -> sari_core::Product {
        db.catalog()
            .create(CreateProduct {
                name: name.to_string(),
                price_cents: Money::from_cents(cents),
                icon_id: "icon".to_string(),
            })
            .await
            .unwrap()
    }

    async fn credit_sale(db: &Database, product: &sari_core::Product, borrower: &str) {
        db.ledger()
            .confirm_sale(ConfirmSale {
                items: vec![SaleLine {
                    product_id: product.id.clone(),
                    quantity: 2,
                    is_borrowed: true,
                }],
                payment_method: PaymentMethod::Borrow,
                borrower_name: Some(borrower.to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_push_uploads_everything_then_goes_quiet() {
        let remote = Arc::new(MemoryRemote::new());
        let a = device(&remote).await;

        let product = add_product(&a.db, "Kape", 900).await;
        credit_sale(&a.db, &product, "Aling Nena").await;

        let first = a.engine.try_push().await.unwrap();
        assert_eq!(first.products, 1);
        assert_eq!(first.borrowers, 1);
        assert_eq!(first.borrows, 1);
        assert_eq!(first.sales, 1);
        assert_eq!(first.sale_items, 1);
        assert_eq!(first.payments, 0);

        assert_eq!(remote.document_counts(), (1, 1, 1, 1, 1, 0));

        // Nothing changed since: the second push scans an empty window
        let second = a.engine.try_push().await.unwrap();
        assert_eq!(second.total(), 0);
        assert_eq!(remote.document_counts(), (1, 1, 1, 1, 1, 0));
    }

    #[tokio::test]
    async fn test_failed_push_leaves_watermark_untouched() {
        let remote = Arc::new(MemoryRemote::new());
        let a = device(&remote).await;
        add_product(&a.db, "Asin", 500).await;

        remote.set_offline(true);
        let err = a.engine.try_push().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(a.watermark.load().await.unwrap(), None);

        // Back online: the same window is retried in full
        remote.set_offline(false);
        let report = a.engine.try_push().await.unwrap();
        assert_eq!(report.products, 1);
        assert!(a.watermark.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_repayment_travels_between_devices() {
        let remote = Arc::new(MemoryRemote::new());
        let a = device(&remote).await;
        let b = device(&remote).await;

        let product = add_product(&a.db, "Bigas 1kg", 5600).await;
        credit_sale(&a.db, &product, "Mang Kanor").await;
        a.engine.try_push().await.unwrap();

        // Device B learns the catalog and the borrower ledger
        let pull = b.engine.try_pull().await.unwrap();
        assert_eq!(pull.products, 1);
        assert_eq!(pull.borrowers, 1);
        // The borrow's sale never replicated, so the borrow stays remote
        assert_eq!(pull.skipped_borrows, 1);

        // Field-for-field identical to the row device A created
        let product_on_b = b.db.catalog().get(&product.id).await.unwrap().unwrap();
        assert_eq!(product_on_b, product);
        assert_eq!(b.db.ledger().borrowers().await.unwrap().len(), 1);

        // Re-pulling the same window is a no-op (idempotent upserts)
        b.engine.try_pull().await.unwrap();
        assert_eq!(b.db.ledger().borrowers().await.unwrap().len(), 1);
        assert_eq!(b.db.catalog().count().await.unwrap(), 1);

        // A repays fully; the resolved borrow replicates back through the
        // remote store (B pulls it, still skipped without the sale, but the
        // remote document now carries the RESOLVED state for device A's twin)
        let borrowers = a.db.ledger().borrowers().await.unwrap();
        let borrows = a
            .db
            .ledger()
            .borrows_for_borrower(&borrowers[0].id)
            .await
            .unwrap();
        a.db.ledger()
            .record_payment(&borrows[0].id, borrows[0].outstanding_balance_cents)
            .await
            .unwrap();
        let report = a.engine.try_push().await.unwrap();
        assert_eq!(report.borrows, 1);
        assert_eq!(report.payments, 1);

        let remote_borrows = remote.borrows_changed_since(0).await.unwrap();
        assert!(remote_borrows[0].outstanding_balance_cents.is_zero());
    }

    #[tokio::test]
    async fn test_pull_applies_newer_product_edits_last_writer_wins() {
        let remote = Arc::new(MemoryRemote::new());
        let a = device(&remote).await;
        let b = device(&remote).await;

        let product = add_product(&a.db, "Suka", 1400).await;
        a.engine.try_push().await.unwrap();
        b.engine.try_pull().await.unwrap();

        // B re-prices the product and pushes
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        b.db.catalog()
            .update(
                &product.id,
                UpdateProduct {
                    price_cents: Some(Money::from_cents(1600)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        b.engine.try_push().await.unwrap();

        // A pulls and converges on B's newer edit
        a.engine.try_pull().await.unwrap();
        let on_a = a.db.catalog().get(&product.id).await.unwrap().unwrap();
        assert_eq!(on_a.price_cents.cents(), 1600);
    }

    #[tokio::test]
    async fn test_pull_does_not_advance_watermark() {
        let remote = Arc::new(MemoryRemote::new());
        let a = device(&remote).await;
        let b = device(&remote).await;

        add_product(&a.db, "Toyo", 1600).await;
        a.engine.try_push().await.unwrap();

        b.engine.try_pull().await.unwrap();
        assert_eq!(b.watermark.load().await.unwrap(), None);

        // B's first push therefore scans from 0 and re-uploads the pulled
        // product; the id-keyed upsert makes that a no-op remotely
        let report = b.engine.try_push().await.unwrap();
        assert_eq!(report.products, 1);
        assert_eq!(remote.document_counts().0, 1);
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_swallow_failures() {
        let remote = Arc::new(MemoryRemote::new());
        let a = device(&remote).await;
        add_product(&a.db, "Posporo", 500).await;

        remote.set_offline(true);
        // Neither hook may panic or propagate the error
        a.engine.on_background().await;
        a.engine.on_foreground().await;
        assert_eq!(a.watermark.load().await.unwrap(), None);
    }
}
