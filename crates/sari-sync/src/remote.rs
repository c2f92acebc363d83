//! # Remote Store Seam
//!
//! The sync engine talks to the shared document store through the
//! [`RemoteStore`] trait, so the backend (a cloud document database, a
//! self-hosted server, or the in-memory test double) is swappable without
//! touching the engine.
//!
//! ## Collection Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One remote collection per table; documents are keyed by entity id.    │
//! │                                                                         │
//! │  MUTABLE collections (upsert + changed_since):                         │
//! │    products   — change timestamp: updated_at                           │
//! │    borrowers  — create-only, change timestamp: created_at              │
//! │    borrows    — change timestamp: updated_at                           │
//! │                                                                         │
//! │  IMMUTABLE collections (put only; never pulled in this protocol):      │
//! │    sales, sale_items, borrow_payments                                  │
//! │                                                                         │
//! │  Every write is an upsert keyed by id, so re-pushing rows after a      │
//! │  lost watermark write is harmless.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use thiserror::Error;

use sari_core::{Borrow, BorrowPayment, Borrower, Product, Sale, SaleItem, TimestampMs};

/// Errors surfaced by a remote store backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The backend could not be reached.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The backend understood the request and refused it.
    #[error("remote rejected request: {0}")]
    Rejected(String),
}

/// Result type alias for remote store calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Abstract shared document store.
///
/// Writes must be idempotent upserts keyed by entity id. `changed_since`
/// queries compare against each collection's change timestamp and return
/// documents strictly newer than the given watermark.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // -- mutable collections --------------------------------------------------

    async fn upsert_products(&self, products: &[Product]) -> RemoteResult<()>;
    async fn upsert_borrowers(&self, borrowers: &[Borrower]) -> RemoteResult<()>;
    async fn upsert_borrows(&self, borrows: &[Borrow]) -> RemoteResult<()>;

    async fn products_changed_since(&self, watermark: TimestampMs) -> RemoteResult<Vec<Product>>;
    async fn borrowers_changed_since(&self, watermark: TimestampMs)
        -> RemoteResult<Vec<Borrower>>;
    async fn borrows_changed_since(&self, watermark: TimestampMs) -> RemoteResult<Vec<Borrow>>;

    // -- immutable collections (append-only from this device's view) ---------

    async fn put_sales(&self, sales: &[Sale]) -> RemoteResult<()>;
    async fn put_sale_items(&self, items: &[SaleItem]) -> RemoteResult<()>;
    async fn put_borrow_payments(&self, payments: &[BorrowPayment]) -> RemoteResult<()>;
}

impl From<RemoteError> for crate::error::SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(msg) => crate::error::SyncError::RemoteUnavailable(msg),
            RemoteError::Rejected(msg) => crate::error::SyncError::RemoteRejected(msg),
        }
    }
}
