//! # sari-db: Database Layer for Sari POS
//!
//! SQLite-backed storage for the transactional ledger: products, sales,
//! borrows and payments, plus the read-only statistics and analytics
//! surfaces.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sari POS Data Flow                              │
//! │                                                                         │
//! │  Caller (UI command / sync engine)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      sari-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations   │   │   │
//! │  │   │   (pool.rs)   │◄──│ catalog/ledger │   │ user_version  │   │   │
//! │  │   │               │   │ stats/analytics│   │   counter     │   │   │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL, foreign keys ON) — exclusively owned by this        │
//! │  device's instance; the remote document store is the only             │
//! │  inter-device coordination point.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Versioned embedded migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::analytics::AnalyticsRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::ledger::LedgerRepository;
pub use repository::statistics::StatisticsRepository;

// =============================================================================
// Shared Helpers
// =============================================================================

use sari_core::TimestampMs;

/// Current instant as Unix milliseconds — the timestamp unit of every
/// schema column and the sync watermark.
pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}

/// Generates a new entity id (UUID v4). Client-side generation lets every
/// device create records without coordination.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
