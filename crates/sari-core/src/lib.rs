//! # sari-core: Pure Business Logic for Sari POS
//!
//! The domain heart of Sari POS, a small-retail point-of-sale system for
//! sari-sari stores: cash and credit ("borrow") sales, a product catalog
//! with sales-frequency tiers, and the records the sync engine replicates.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sari POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ sari-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │   money   │  │ validation│                  │   │
//! │  │   │  Product  │  │   Money   │  │   rules   │                  │   │
//! │  │   │   Sale    │  │  (cents)  │  │  checks   │                  │   │
//! │  │   │  Borrow   │  └───────────┘  └───────────┘                  │   │
//! │  │   └───────────┘                                                │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └───────────────┬─────────────────────────┬───────────────────────┘   │
//! │                  │                         │                            │
//! │  ┌───────────────▼──────────┐  ┌───────────▼────────────────────────┐  │
//! │  │   sari-db (SQLite)       │  │   sari-sync (push/pull engine)     │  │
//! │  └──────────────────────────┘  └────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic, no clock and no I/O in this crate
//! 2. **Integer Money**: all amounts are centavos (i64), never floats
//! 3. **Explicit Errors**: typed errors, never strings or panics
//! 4. **Millisecond Timestamps**: every timestamp is Unix millis (i64),
//!    the unit the sync watermark compares against

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Lookback window for frequency-tier classification: the W most recently
/// confirmed sales are inspected for product appearances.
pub const FREQUENCY_WINDOW: i64 = 100;

/// A product appearing in more than this many of the last
/// [`FREQUENCY_WINDOW`] sales is tier FREQUENT.
pub const FREQUENT_THRESHOLD: i64 = 80;

/// A product appearing in fewer than this many of the last
/// [`FREQUENCY_WINDOW`] sales is tier SELDOM.
pub const SELDOM_THRESHOLD: i64 = 20;

/// Maximum quantity of a single line item.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g. typing 1000 instead of 10) in a
/// store where nobody buys 999 of anything.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Unix-millisecond timestamp, the unit used for every `created_at` /
/// `updated_at` / `confirmed_at` / `paid_at` column and the sync watermark.
pub type TimestampMs = i64;
