//! # Domain Types
//!
//! Core domain types used throughout Sari POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  name           │   │  payment_method │   │  product_id (FK)│       │
//! │  │  price_cents    │   │  confirmed_at   │   │  price_at_sale  │       │
//! │  │  updated_at  ◄──┼── sync watermark    │   │  is_borrowed    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Borrower     │   │     Borrow      │   │  BorrowPayment  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  name (unique,  │   │  outstanding_   │   │  amount_cents   │       │
//! │  │   case-insens.) │   │   balance_cents │   │  paid_at        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mutability Split (drives sync)
//! - **Mutable**: Product, Borrower (create-only), Borrow — updated in place,
//!   replicated by `updated_at` (`created_at` for Borrower).
//! - **Immutable**: Sale, SaleItem, BorrowPayment — written once, replicated
//!   by their own creation timestamp (SaleItem by its parent Sale's).

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::TimestampMs;

// =============================================================================
// Enums
// =============================================================================

/// How a confirmed sale was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Fully paid in cash at the counter.
    Cash,
    /// Fully taken on credit; every item is borrowed.
    Borrow,
    /// Mixed: some items paid in cash, some taken on credit.
    Partial,
}

impl PaymentMethod {
    /// Whether this method creates a Borrow record.
    #[inline]
    pub const fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Borrow | PaymentMethod::Partial)
    }
}

/// Lifecycle state of a borrow.
///
/// `Resolved` iff the outstanding balance is exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum BorrowStatus {
    Active,
    Resolved,
}

/// Coarse popularity classification derived from recent-sale appearances.
///
/// Computed on read, never persisted — see the catalog repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrequencyTier {
    Frequent,
    Normal,
    Seldom,
}

impl FrequencyTier {
    /// Sort rank: FREQUENT < NORMAL < SELDOM (listing order).
    #[inline]
    pub const fn rank(&self) -> u8 {
        match self {
            FrequencyTier::Frequent => 0,
            FrequencyTier::Normal => 1,
            FrequencyTier::Seldom => 2,
        }
    }
}

/// Fixed historical reporting periods. Statistics always cover the most
/// recently COMPLETED period, never the in-progress one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatsPeriod {
    /// Yesterday, local calendar day.
    Day,
    /// The last full Monday-Sunday week.
    Week,
    /// The previous calendar month.
    Month,
    /// The previous calendar year.
    Year,
}

// =============================================================================
// Entities (mirror the SQLite schema 1:1)
// =============================================================================

/// A product in the catalog.
///
/// Mutable: `updated_at` is the sync watermark column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4, generated client-side).
    pub id: String,
    /// Display name, trimmed on write.
    pub name: String,
    /// Current price in centavos. Historical sales keep their own snapshot.
    pub price_cents: Money,
    /// Icon reference resolved by the UI layer.
    pub icon_id: String,
    pub created_at: TimestampMs,
    pub updated_at: TimestampMs,
}

/// A confirmed sale. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub payment_method: PaymentMethod,
    /// Creation instant; doubles as the sync timestamp for the sale and
    /// its items.
    pub confirmed_at: TimestampMs,
}

/// A line item of a confirmed sale. Immutable.
///
/// Uses the snapshot pattern: `price_at_sale_cents` is frozen at confirm
/// time and never recomputed from the current product price, so historical
/// totals are stable even if prices later change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in centavos at time of sale (frozen).
    pub price_at_sale_cents: Money,
    /// Whether this line was taken on credit.
    pub is_borrowed: bool,
}

impl SaleItem {
    /// Line total: frozen unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price_at_sale_cents.multiply_quantity(self.quantity)
    }
}

/// A customer who buys on credit.
///
/// Names are unique case-insensitively; repeated borrow sales for the same
/// name reuse the same borrower. There is no rename operation, so
/// `created_at` is the sync timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Borrower {
    pub id: String,
    pub name: String,
    pub created_at: TimestampMs,
}

/// Credit extended against a single sale (1:1 with its sale).
///
/// Mutable: payments reduce `outstanding_balance_cents` monotonically and
/// refresh `updated_at` (the sync watermark column).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Borrow {
    pub id: String,
    pub borrower_id: String,
    pub sale_id: String,
    /// Σ price_at_sale × quantity over the sale's borrowed items. Fixed.
    pub total_amount_cents: Money,
    /// total_amount − Σ payments. Never negative.
    pub outstanding_balance_cents: Money,
    pub status: BorrowStatus,
    pub created_at: TimestampMs,
    pub updated_at: TimestampMs,
}

impl Borrow {
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.status == BorrowStatus::Resolved
    }
}

/// A repayment against a borrow. Immutable; `paid_at` is the sync timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BorrowPayment {
    pub id: String,
    pub borrow_id: String,
    pub amount_cents: Money,
    pub paid_at: TimestampMs,
}

// =============================================================================
// Derived / Joined Views
// =============================================================================

/// A catalog product joined with its computed frequency tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductWithTier {
    pub product: Product,
    pub frequency_tier: FrequencyTier,
}

/// A sale line item joined with its product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItemWithProduct {
    pub item: SaleItem,
    pub product: Product,
}

/// A confirmed sale with its line items joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItemWithProduct>,
    /// Σ line totals, reconstructed from the frozen snapshots.
    pub total: Money,
}

/// A borrow with its borrower, parent sale and payment history joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowWithDetails {
    pub borrow: Borrow,
    pub borrower: Borrower,
    pub sale: SaleWithItems,
    pub payments: Vec<BorrowPayment>,
}

// =============================================================================
// Statistics
// =============================================================================

/// A product ranked in a period summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product: Product,
    /// Units sold within the period.
    pub total_sold: i64,
    /// Revenue within the period (frozen snapshot prices).
    pub revenue: Money,
}

/// Aggregates over the most recently completed period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub period: StatsPeriod,
    /// Inclusive start of the completed period (Unix millis, local calendar).
    pub from: TimestampMs,
    /// Inclusive end of the completed period (Unix millis, local calendar).
    pub to: TimestampMs,
    pub total_revenue: Money,
    /// Distinct sales in range.
    pub transaction_count: i64,
    /// Top 5 products by units sold; ties broken by product id.
    pub top_products: Vec<TopProduct>,
}

// =============================================================================
// Analytics Buckets (consumed by the forecast/insight module)
// =============================================================================

/// Sales count for one local hour of day (0-23).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct HourlySales {
    pub hour: i64,
    pub count: i64,
}

/// Sales count for one local weekday (0 = Sunday .. 6 = Saturday).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WeekdaySales {
    pub weekday: i64,
    pub count: i64,
}

/// Distinct-sale appearances of one product on one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DailyAppearances {
    /// ISO date string (`YYYY-MM-DD`), local calendar.
    pub day: String,
    pub appearances: i64,
}

// =============================================================================
// Repository Payloads
// =============================================================================

/// One line of a sale being confirmed. The repository snapshots the
/// product's current price inside the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
    pub is_borrowed: bool,
}

/// Input to `LedgerRepository::confirm_sale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmSale {
    pub items: Vec<SaleLine>,
    pub payment_method: PaymentMethod,
    /// Required when `payment_method` is BORROW or PARTIAL.
    pub borrower_name: Option<String>,
}

/// Input to `CatalogRepository::create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price_cents: Money,
    pub icon_id: String,
}

/// Partial update for `CatalogRepository::update`. Only supplied fields are
/// merged; `updated_at` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub price_cents: Option<Money>,
    pub icon_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
