//! # In-Memory Remote Store
//!
//! A [`RemoteStore`] backed by process-local hash maps. Serves two roles:
//! the test double for the sync engine, and a working backend for demos
//! where several `Database` instances in one process share a store.
//!
//! Documents are keyed by id; re-upserting the same id overwrites, which
//! matches the idempotence contract real backends must honor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::remote::{RemoteError, RemoteResult, RemoteStore};
use sari_core::{Borrow, BorrowPayment, Borrower, Product, Sale, SaleItem, TimestampMs};

#[derive(Debug, Default)]
struct Collections {
    products: HashMap<String, Product>,
    borrowers: HashMap<String, Borrower>,
    borrows: HashMap<String, Borrow>,
    sales: HashMap<String, Sale>,
    sale_items: HashMap<String, SaleItem>,
    borrow_payments: HashMap<String, BorrowPayment>,
}

/// Shared in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    collections: Mutex<Collections>,
    /// When set, every call fails as if the network were down.
    offline: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing or regaining connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of documents per collection, for test assertions:
    /// (products, borrowers, borrows, sales, sale_items, borrow_payments).
    pub fn document_counts(&self) -> (usize, usize, usize, usize, usize, usize) {
        let c = self.lock();
        (
            c.products.len(),
            c.borrowers.len(),
            c.borrows.len(),
            c.sales.len(),
            c.sale_items.len(),
            c.borrow_payments.len(),
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collections> {
        // A poisoned test-double mutex has no recovery path worth writing
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_online(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Unavailable("simulated offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upsert_products(&self, products: &[Product]) -> RemoteResult<()> {
        self.check_online()?;
        let mut c = self.lock();
        for p in products {
            c.products.insert(p.id.clone(), p.clone());
        }
        Ok(())
    }

    async fn upsert_borrowers(&self, borrowers: &[Borrower]) -> RemoteResult<()> {
        self.check_online()?;
        let mut c = self.lock();
        for b in borrowers {
            c.borrowers.insert(b.id.clone(), b.clone());
        }
        Ok(())
    }

    async fn upsert_borrows(&self, borrows: &[Borrow]) -> RemoteResult<()> {
        self.check_online()?;
        let mut c = self.lock();
        for b in borrows {
            c.borrows.insert(b.id.clone(), b.clone());
        }
        Ok(())
    }

    async fn products_changed_since(&self, watermark: TimestampMs) -> RemoteResult<Vec<Product>> {
        self.check_online()?;
        let c = self.lock();
        Ok(c.products
            .values()
            .filter(|p| p.updated_at > watermark)
            .cloned()
            .collect())
    }

    async fn borrowers_changed_since(
        &self,
        watermark: TimestampMs,
    ) -> RemoteResult<Vec<Borrower>> {
        self.check_online()?;
        let c = self.lock();
        Ok(c.borrowers
            .values()
            .filter(|b| b.created_at > watermark)
            .cloned()
            .collect())
    }

    async fn borrows_changed_since(&self, watermark: TimestampMs) -> RemoteResult<Vec<Borrow>> {
        self.check_online()?;
        let c = self.lock();
        Ok(c.borrows
            .values()
            .filter(|b| b.updated_at > watermark)
            .cloned()
            .collect())
    }

    async fn put_sales(&self, sales: &[Sale]) -> RemoteResult<()> {
        self.check_online()?;
        let mut c = self.lock();
        for s in sales {
            c.sales.insert(s.id.clone(), s.clone());
        }
        Ok(())
    }

    async fn put_sale_items(&self, items: &[SaleItem]) -> RemoteResult<()> {
        self.check_online()?;
        let mut c = self.lock();
        for i in items {
            c.sale_items.insert(i.id.clone(), i.clone());
        }
        Ok(())
    }

    async fn put_borrow_payments(&self, payments: &[BorrowPayment]) -> RemoteResult<()> {
        self.check_online()?;
        let mut c = self.lock();
        for p in payments {
            c.borrow_payments.insert(p.id.clone(), p.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, updated_at: TimestampMs) -> Product {
        Product {
            id: id.to_string(),
            name: id.to_string(),
            price_cents: sari_core::Money::from_cents(100),
            icon_id: "icon".to_string(),
            created_at: updated_at,
            updated_at,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let remote = MemoryRemote::new();
        remote.upsert_products(&[product("p1", 10)]).await.unwrap();
        remote.upsert_products(&[product("p1", 20)]).await.unwrap();

        let changed = remote.products_changed_since(0).await.unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].updated_at, 20);
    }

    #[tokio::test]
    async fn test_changed_since_is_strictly_after() {
        let remote = MemoryRemote::new();
        remote
            .upsert_products(&[product("p1", 10), product("p2", 20)])
            .await
            .unwrap();

        let changed = remote.products_changed_since(10).await.unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id, "p2");
    }

    #[tokio::test]
    async fn test_offline_mode_fails_every_call() {
        let remote = MemoryRemote::new();
        remote.set_offline(true);

        let err = remote.upsert_products(&[product("p1", 1)]).await.unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable(_)));

        remote.set_offline(false);
        remote.upsert_products(&[product("p1", 1)]).await.unwrap();
    }
}
