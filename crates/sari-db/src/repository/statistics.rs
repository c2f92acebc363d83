//! # Statistics Repository
//!
//! Read-only aggregation over the transactional ledger.
//!
//! ## Completed Periods Only
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Statistics always cover the most recently COMPLETED period, never     │
//! │  the one in progress — a half-elapsed day would make every number      │
//! │  look like a slump.                                                    │
//! │                                                                         │
//! │  DAY   → yesterday (local calendar day)                                │
//! │  WEEK  → the last full Monday..Sunday week                             │
//! │  MONTH → the previous calendar month                                   │
//! │  YEAR  → the previous calendar year                                    │
//! │                                                                         │
//! │  Bounds are inclusive millisecond ranges: [start, next_start − 1ms].   │
//! │  Revenue is summed from frozen price snapshots, so the same period     │
//! │  reports the same total forever, regardless of later price edits.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use sari_core::{Money, Product, StatsPeriod, StatsSummary, TimestampMs, TopProduct};

/// How many ranked products a summary carries.
const TOP_PRODUCT_LIMIT: i64 = 5;

/// Repository for period statistics.
#[derive(Debug, Clone)]
pub struct StatisticsRepository {
    pool: SqlitePool,
}

impl StatisticsRepository {
    /// Creates a new StatisticsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StatisticsRepository { pool }
    }

    /// Builds the summary for the most recently completed period, evaluated
    /// against the local wall clock.
    pub async fn summary(&self, period: StatsPeriod) -> DbResult<StatsSummary> {
        self.summary_at(period, Local::now()).await
    }

    /// Like [`summary`](Self::summary) but with an explicit "now", so tests
    /// can pin the reference instant.
    pub async fn summary_at(
        &self,
        period: StatsPeriod,
        now: DateTime<Local>,
    ) -> DbResult<StatsSummary> {
        let (from, to) = completed_period_bounds(period, now)?;
        debug!(?period, from, to, "Computing period summary");

        let (transaction_count, total_revenue): (i64, Money) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT s.id),
                   COALESCE(SUM(si.quantity * si.price_at_sale_cents), 0)
            FROM sales s
            LEFT JOIN sale_items si ON si.sale_id = s.id
            WHERE s.confirmed_at BETWEEN ?1 AND ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let top_products = self.top_products(from, to).await?;

        Ok(StatsSummary {
            period,
            from,
            to,
            total_revenue,
            transaction_count,
            top_products,
        })
    }

    /// Products ranked by units sold within the range. Ordering is
    /// deterministic: units sold descending, then product id, so two
    /// devices render the same list for the same ledger.
    async fn top_products(
        &self,
        from: TimestampMs,
        to: TimestampMs,
    ) -> DbResult<Vec<TopProduct>> {
        #[derive(sqlx::FromRow)]
        struct Row {
            id: String,
            name: String,
            price_cents: Money,
            icon_id: String,
            created_at: TimestampMs,
            updated_at: TimestampMs,
            total_sold: i64,
            revenue: Money,
        }

        let rows = sqlx::query_as::<_, Row>(
            r#"
            SELECT p.id, p.name, p.price_cents, p.icon_id, p.created_at, p.updated_at,
                   SUM(si.quantity) AS total_sold,
                   SUM(si.quantity * si.price_at_sale_cents) AS revenue
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.confirmed_at BETWEEN ?1 AND ?2
            GROUP BY p.id
            ORDER BY total_sold DESC, p.id ASC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(TOP_PRODUCT_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopProduct {
                product: Product {
                    id: row.id,
                    name: row.name,
                    price_cents: row.price_cents,
                    icon_id: row.icon_id,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                },
                total_sold: row.total_sold,
                revenue: row.revenue,
            })
            .collect())
    }
}

// =============================================================================
// Period Bounds
// =============================================================================

/// Inclusive millisecond bounds of the most recently completed period
/// relative to `now`, on the local calendar.
pub fn completed_period_bounds(
    period: StatsPeriod,
    now: DateTime<Local>,
) -> DbResult<(TimestampMs, TimestampMs)> {
    let today = now.date_naive();

    let (start, end_exclusive) = match period {
        StatsPeriod::Day => {
            let yesterday = today
                .pred_opt()
                .ok_or_else(|| DbError::Internal("date underflow".to_string()))?;
            (yesterday, today)
        }
        StatsPeriod::Week => {
            let days_from_monday = today.weekday().num_days_from_monday() as i64;
            let this_monday = today - chrono::Duration::days(days_from_monday);
            (this_monday - chrono::Duration::days(7), this_monday)
        }
        StatsPeriod::Month => {
            let this_month_start = first_of_month(today.year(), today.month())?;
            let (prev_year, prev_month) = if today.month() == 1 {
                (today.year() - 1, 12)
            } else {
                (today.year(), today.month() - 1)
            };
            (first_of_month(prev_year, prev_month)?, this_month_start)
        }
        StatsPeriod::Year => {
            let this_year_start = first_of_month(today.year(), 1)?;
            (first_of_month(today.year() - 1, 1)?, this_year_start)
        }
    };

    Ok((local_midnight_ms(start)?, local_midnight_ms(end_exclusive)? - 1))
}

fn first_of_month(year: i32, month: u32) -> DbResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| DbError::Internal(format!("invalid date {year}-{month:02}-01")))
}

/// Local midnight of `date` as Unix millis. On a DST gap where midnight
/// doesn't exist, the earlier valid mapping is used.
fn local_midnight_ms(date: NaiveDate) -> DbResult<TimestampMs> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| DbError::Internal(format!("invalid midnight for {date}")))?;

    match Local.from_local_datetime(&midnight) {
        chrono::LocalResult::Single(dt) => Ok(dt.timestamp_millis()),
        chrono::LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp_millis()),
        chrono::LocalResult::None => Err(DbError::Internal(format!(
            "no local midnight for {date}"
        ))),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
