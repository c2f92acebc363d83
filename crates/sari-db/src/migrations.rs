//! # Database Migrations
//!
//! Versioned, embedded SQL migrations gated by SQLite's `user_version`
//! counter.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Read PRAGMA user_version (0 on a fresh database)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  For each step with version > user_version, in ascending order:        │
//! │       │                                                                 │
//! │       ├── BEGIN                                                         │
//! │       ├── run the step's DDL                                            │
//! │       ├── PRAGMA user_version = <step version>                          │
//! │       └── COMMIT  ← counter advances only if the DDL succeeded         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Failure? → MigrationFailed, startup aborts, no partial version state  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Append a `(version, DDL)` pair to [`MIGRATIONS`] with the next version
//! 2. **NEVER** modify an existing step - always add new ones
//! 3. Write idempotent SQL (`IF NOT EXISTS`) as a belt-and-braces measure

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Schema version 1: the full ledger schema.
///
/// Money columns are integer centavos; timestamps are Unix milliseconds.
/// CHECK constraints are defense in depth — repositories validate business
/// rules before the storage layer ever sees them.
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
    icon_id     TEXT NOT NULL,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sales (
    id             TEXT PRIMARY KEY,
    payment_method TEXT NOT NULL CHECK (payment_method IN ('CASH', 'BORROW', 'PARTIAL')),
    confirmed_at   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sale_items (
    id                  TEXT    PRIMARY KEY,
    sale_id             TEXT    NOT NULL REFERENCES sales(id),
    product_id          TEXT    NOT NULL REFERENCES products(id),
    quantity            INTEGER NOT NULL CHECK (quantity >= 1),
    price_at_sale_cents INTEGER NOT NULL CHECK (price_at_sale_cents >= 0),
    is_borrowed         INTEGER NOT NULL DEFAULT 0 CHECK (is_borrowed IN (0, 1))
);

CREATE TABLE IF NOT EXISTS borrowers (
    id         TEXT    PRIMARY KEY,
    name       TEXT    NOT NULL COLLATE NOCASE,
    created_at INTEGER NOT NULL,
    UNIQUE (name)
);

CREATE TABLE IF NOT EXISTS borrows (
    id                         TEXT    PRIMARY KEY,
    borrower_id                TEXT    NOT NULL REFERENCES borrowers(id),
    sale_id                    TEXT    NOT NULL UNIQUE REFERENCES sales(id),
    total_amount_cents         INTEGER NOT NULL CHECK (total_amount_cents > 0),
    outstanding_balance_cents  INTEGER NOT NULL CHECK (outstanding_balance_cents >= 0),
    status                     TEXT    NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'RESOLVED')),
    created_at                 INTEGER NOT NULL,
    updated_at                 INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS borrow_payments (
    id           TEXT    PRIMARY KEY,
    borrow_id    TEXT    NOT NULL REFERENCES borrows(id),
    amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
    paid_at      INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sales_confirmed_at
    ON sales (confirmed_at DESC);

CREATE INDEX IF NOT EXISTS idx_sale_items_product_id
    ON sale_items (product_id);

CREATE INDEX IF NOT EXISTS idx_sale_items_sale_id
    ON sale_items (sale_id);

CREATE INDEX IF NOT EXISTS idx_borrows_borrower_id
    ON borrows (borrower_id);

CREATE INDEX IF NOT EXISTS idx_borrow_payments_borrow_id
    ON borrow_payments (borrow_id);
"#;

/// Ordered migration steps. The version counter is SQLite's `user_version`
/// pragma, persisted in the database header itself.
const MIGRATIONS: &[(i64, &str)] = &[(1, SCHEMA_V1)];

/// Runs all pending database migrations.
///
/// ## Safety
/// - Idempotent: safe to run multiple times
/// - Transactional: each step's DDL and version bump commit together
/// - Ordered: steps run in ascending version order, each at most once
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let version = current_version(pool).await?;
    debug!(version, "Checking for pending migrations");

    for (target, ddl) in MIGRATIONS {
        if version >= *target {
            continue;
        }

        info!(version = target, "Applying migration");

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| DbError::MigrationFailed(e.to_string()))?;

        sqlx::raw_sql(ddl)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::MigrationFailed(format!("v{target}: {e}")))?;

        // The version advances in the same transaction as the DDL: a crash
        // at any point leaves either the old version or the new schema.
        sqlx::raw_sql(&format!("PRAGMA user_version = {target}"))
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::MigrationFailed(format!("v{target}: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| DbError::MigrationFailed(format!("v{target}: {e}")))?;
    }

    info!("All migrations applied");
    Ok(())
}

/// Reads the persisted schema version (`PRAGMA user_version`, 0 on a fresh
/// database).
pub async fn current_version(pool: &SqlitePool) -> DbResult<i64> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

/// Latest schema version this build knows about.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_migrations_reach_latest_version() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let version = current_version(db.pool()).await.unwrap();
        assert_eq!(version, latest_version());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        // Second run sees user_version already at latest and does nothing
        run_migrations(db.pool()).await.unwrap();
        let version = current_version(db.pool()).await.unwrap();
        assert_eq!(version, latest_version());
    }
}
