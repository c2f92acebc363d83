//! # Analytics Repository
//!
//! Read-only distributions consumed by the insight layer (busy-hour hints,
//! restock suggestions). All bucketing happens in SQL: timestamps are Unix
//! millis, so `confirmed_at / 1000` feeds `strftime(..., 'unixepoch',
//! 'localtime')` to bucket on the store's local calendar.
//!
//! Buckets with no sales are simply absent from the result; callers that
//! want dense 24-hour or 7-day vectors fill the gaps themselves.

use sqlx::SqlitePool;

use crate::error::DbResult;
use sari_core::{DailyAppearances, HourlySales, TimestampMs, WeekdaySales};

/// Repository for sales-pattern distributions.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    /// Creates a new AnalyticsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsRepository { pool }
    }

    /// Sales per local hour of day (0-23) since the given instant,
    /// ascending by hour.
    pub async fn hourly_sale_distribution(
        &self,
        since: TimestampMs,
    ) -> DbResult<Vec<HourlySales>> {
        let rows = sqlx::query_as::<_, HourlySales>(
            r#"
            SELECT CAST(strftime('%H', confirmed_at / 1000, 'unixepoch', 'localtime') AS INTEGER) AS hour,
                   COUNT(*) AS count
            FROM sales
            WHERE confirmed_at >= ?1
            GROUP BY hour
            ORDER BY hour ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sales per local weekday (0 = Sunday .. 6 = Saturday, SQLite's `%w`
    /// convention) since the given instant, ascending by weekday.
    pub async fn weekday_sale_distribution(
        &self,
        since: TimestampMs,
    ) -> DbResult<Vec<WeekdaySales>> {
        let rows = sqlx::query_as::<_, WeekdaySales>(
            r#"
            SELECT CAST(strftime('%w', confirmed_at / 1000, 'unixepoch', 'localtime') AS INTEGER) AS weekday,
                   COUNT(*) AS count
            FROM sales
            WHERE confirmed_at >= ?1
            GROUP BY weekday
            ORDER BY weekday ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Distinct-sale appearances of one product per local calendar day
    /// since the given instant, ascending by day. Multiple lines of the
    /// same product within one sale count once.
    pub async fn daily_appearance_counts(
        &self,
        product_id: &str,
        since: TimestampMs,
    ) -> DbResult<Vec<DailyAppearances>> {
        let rows = sqlx::query_as::<_, DailyAppearances>(
            r#"
            SELECT date(s.confirmed_at / 1000, 'unixepoch', 'localtime') AS day,
                   COUNT(DISTINCT si.sale_id) AS appearances
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            WHERE si.product_id = ?1 AND s.confirmed_at >= ?2
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(product_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_id;
    use crate::pool::{Database, DbConfig};
    use chrono::{Local, TimeZone};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> TimestampMs {
        Local
            .with_ymd_and_hms(y, m, d, h, 15, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    async fn insert_sale(db: &Database, confirmed_at: TimestampMs, product_id: Option<&str>) {
        let sale_id = generate_id();
        sqlx::query("INSERT INTO sales (id, payment_method, confirmed_at) VALUES (?1, 'CASH', ?2)")
            .bind(&sale_id)
            .bind(confirmed_at)
            .execute(db.pool())
            .await
            .unwrap();

        if let Some(product_id) = product_id {
            sqlx::query(
                "INSERT OR IGNORE INTO products (id, name, price_cents, icon_id, created_at, updated_at)
                 VALUES (?1, ?1, 100, 'icon', ?2, ?2)",
            )
            .bind(product_id)
            .bind(confirmed_at)
            .execute(db.pool())
            .await
            .unwrap();

            // Two lines of the same product in one sale: must count once
            for _ in 0..2 {
                sqlx::query(
                    "INSERT INTO sale_items (id, sale_id, product_id, quantity, price_at_sale_cents, is_borrowed)
                     VALUES (?1, ?2, ?3, 1, 100, 0)",
                )
                .bind(generate_id())
                .bind(&sale_id)
                .bind(product_id)
                .execute(db.pool())
                .await
                .unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_hourly_distribution_buckets_by_local_hour() {
        let db = test_db().await;
        insert_sale(&db, at(2026, 8, 25, 7), None).await;
        insert_sale(&db, at(2026, 8, 25, 7), None).await;
        insert_sale(&db, at(2026, 8, 26, 18), None).await;

        let hours = db.analytics().hourly_sale_distribution(0).await.unwrap();
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0], HourlySales { hour: 7, count: 2 });
        assert_eq!(hours[1], HourlySales { hour: 18, count: 1 });
    }

    #[tokio::test]
    async fn test_weekday_distribution_uses_sunday_zero() {
        let db = test_db().await;
        // 2026-08-23 is a Sunday, 2026-08-24 a Monday
        insert_sale(&db, at(2026, 8, 23, 10), None).await;
        insert_sale(&db, at(2026, 8, 24, 10), None).await;
        insert_sale(&db, at(2026, 8, 24, 16), None).await;

        let days = db.analytics().weekday_sale_distribution(0).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0], WeekdaySales { weekday: 0, count: 1 });
        assert_eq!(days[1], WeekdaySales { weekday: 1, count: 2 });
    }

    #[tokio::test]
    async fn test_daily_appearances_dedupe_lines_and_honor_since() {
        let db = test_db().await;
        insert_sale(&db, at(2026, 8, 20, 9), Some("p1")).await;
        insert_sale(&db, at(2026, 8, 25, 9), Some("p1")).await;
        insert_sale(&db, at(2026, 8, 25, 17), Some("p1")).await;
        insert_sale(&db, at(2026, 8, 25, 17), Some("p2")).await;

        let counts = db
            .analytics()
            .daily_appearance_counts("p1", at(2026, 8, 22, 0))
            .await
            .unwrap();

        // Aug 20 filtered by `since`; each sale counts once despite 2 lines
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].appearances, 2);
        assert!(counts[0].day.ends_with("-25"));
    }
}
