//! # sari-sync: Sync Engine for Sari POS
//!
//! Watermark-based reconciliation between this device's SQLite ledger and
//! a shared remote document store.
//!
//! ## Offline-First Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Never Blocks a Sale                         │
//! │                                                                         │
//! │  Local SQLite is the source of truth. Every feature works with sync    │
//! │  never running; the remote store only widens visibility across         │
//! │  devices.                                                               │
//! │                                                                         │
//! │  app → background  ──► on_background() ──► push changed rows           │
//! │  app → foreground  ──► on_foreground() ──► pull mutable collections    │
//! │                                                                         │
//! │  Both hooks absorb every failure: a dead network logs a warning and    │
//! │  the storefront keeps selling.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - push/pull orchestration and the lifecycle entry points
//! - [`remote`] - the [`RemoteStore`] backend seam
//! - [`watermark`] - durable `lastSyncedAt` storage
//! - [`memory`] - in-memory remote store (tests, demos)
//! - [`error`] - sync error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod memory;
pub mod remote;
pub mod watermark;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{PullReport, PushReport, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use memory::MemoryRemote;
pub use remote::{RemoteError, RemoteResult, RemoteStore};
pub use watermark::{FileWatermarkStore, MemoryWatermarkStore, WatermarkStore, WATERMARK_KEY};
