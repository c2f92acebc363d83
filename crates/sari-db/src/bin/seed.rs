//! # Seed Data Generator
//!
//! Populates the database with a realistic sari-sari store history for
//! development: the product catalog, weeks of confirmed sales, and a few
//! open and repaid borrows.
//!
//! ## Usage
//! ```bash
//! # Default: 300 sales over the last 30 days
//! cargo run -p sari-db --bin seed
//!
//! # Custom volume and span
//! cargo run -p sari-db --bin seed -- --sales 1000 --days 90
//!
//! # Specify database path
//! cargo run -p sari-db --bin seed -- --db ./data/sari.db
//! ```

use std::env;

use sari_core::{ConfirmSale, CreateProduct, Money, PaymentMethod, SaleLine};
use sari_db::{Database, DbConfig};

/// Catalog of typical sari-sari store goods: (name, centavos, icon).
const PRODUCTS: &[(&str, i64, &str)] = &[
    ("Coke Sakto 200ml", 1500, "icon-bottle"),
    ("Royal 290ml", 2000, "icon-bottle"),
    ("C2 Apple 230ml", 2200, "icon-bottle"),
    ("Lucky Me Pancit Canton", 1800, "icon-noodles"),
    ("Payless Xtra Big", 1200, "icon-noodles"),
    ("Skyflakes Singles", 800, "icon-snack"),
    ("Piattos Cheese", 2500, "icon-snack"),
    ("Boy Bawang", 1500, "icon-snack"),
    ("Kape Barako 3-in-1", 900, "icon-sachet"),
    ("Milo 24g Sachet", 1100, "icon-sachet"),
    ("Bear Brand 33g", 1300, "icon-sachet"),
    ("Safeguard Bar 60g", 2800, "icon-soap"),
    ("Surf Powder 65g", 1000, "icon-soap"),
    ("Zonrox 100ml", 1200, "icon-bottle"),
    ("Itlog (Pula)", 1200, "icon-egg"),
    ("Bigas 1kg", 5600, "icon-rice"),
    ("Asukal 1/2kg", 3800, "icon-rice"),
    ("Mantika 200ml", 3200, "icon-bottle"),
    ("Toyo 200ml", 1600, "icon-bottle"),
    ("Suka 200ml", 1400, "icon-bottle"),
    ("Posporo", 500, "icon-misc"),
    ("Kandila", 1000, "icon-misc"),
    ("Load Card 100", 10500, "icon-card"),
    ("Yelo 1 Bag", 1000, "icon-misc"),
];

/// Regulars who buy on credit.
const BORROWERS: &[&str] = &[
    "Aling Nena",
    "Mang Kanor",
    "Ka Pedro",
    "Ate Vi",
    "Boy Balot",
    "Lola Iska",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug surfaces repository-level tracing during seeding
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut sale_count: usize = 300;
    let mut days: i64 = 30;
    let mut db_path = String::from("./sari_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sale_count = args[i + 1].parse().unwrap_or(300);
                    i += 1;
                }
            }
            "--days" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Sari POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of sales to generate (default: 300)");
                println!("      --days <N>     Days of history to spread them over (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./sari_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Sari POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Sales:    {} over {} days", sale_count, days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    println!();
    println!("Creating catalog...");
    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (name, cents, icon_id) in PRODUCTS {
        let product = db
            .catalog()
            .create(CreateProduct {
                name: name.to_string(),
                price_cents: Money::from_cents(*cents),
                icon_id: icon_id.to_string(),
            })
            .await?;
        products.push(product);
    }
    println!("✓ {} products", products.len());

    // Sales history
    println!();
    println!("Generating sales...");
    let start = std::time::Instant::now();
    let span_ms = days * 24 * 60 * 60 * 1000;
    let now = sari_db::now_ms();

    let mut borrow_ids = Vec::new();

    for seed in 0..sale_count {
        // Deterministic pseudo-random basket: 1-3 lines, 1-3 units each
        let line_count = 1 + seed % 3;
        let mut items = Vec::with_capacity(line_count);

        // Every 9th sale goes on credit
        let on_credit = seed % 9 == 8;

        for line in 0..line_count {
            let product = &products[(seed * 7 + line * 13) % products.len()];
            items.push(SaleLine {
                product_id: product.id.clone(),
                quantity: (1 + (seed + line) % 3) as i64,
                is_borrowed: on_credit,
            });
        }

        let payload = if on_credit {
            ConfirmSale {
                items,
                payment_method: PaymentMethod::Borrow,
                borrower_name: Some(BORROWERS[seed % BORROWERS.len()].to_string()),
            }
        } else {
            ConfirmSale {
                items,
                payment_method: PaymentMethod::Cash,
                borrower_name: None,
            }
        };

        let sale = db.ledger().confirm_sale(payload).await?;

        // Spread the history over the requested span, skewed toward
        // morning and early-evening store hours
        let day_offset = (seed as i64 * span_ms) / sale_count.max(1) as i64;
        let hour_jitter = ((seed * 37) % 14) as i64 * 60 * 60 * 1000;
        let backdated = now - span_ms + day_offset - hour_jitter;
        sqlx::query("UPDATE sales SET confirmed_at = ?2 WHERE id = ?1")
            .bind(&sale.id)
            .bind(backdated)
            .execute(db.pool())
            .await?;

        if on_credit {
            if let Some(details) = borrow_for_sale(&db, &sale.id).await? {
                borrow_ids.push(details);
            }
        }

        if (seed + 1) % 100 == 0 {
            println!("  Generated {} sales...", seed + 1);
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Generated {} sales in {:?}", sale_count, elapsed);

    // Repay roughly half the borrows, alternating partial and full
    println!();
    println!("Recording repayments...");
    let mut repaid = 0;
    for (idx, borrow_id) in borrow_ids.iter().enumerate() {
        if idx % 2 == 1 {
            continue;
        }
        if let Some(details) = db.ledger().borrow_by_id(borrow_id).await? {
            let outstanding = details.borrow.outstanding_balance_cents;
            let amount = if idx % 4 == 0 {
                outstanding
            } else {
                Money::from_cents((outstanding.cents() / 2).max(1))
            };
            db.ledger().record_payment(borrow_id, amount).await?;
            repaid += 1;
        }
    }
    println!("✓ {} repayments recorded", repaid);

    let total = db.ledger().total_sale_count().await?;
    let borrowers = db.ledger().borrowers().await?;
    println!();
    println!("✓ Seed complete: {} sales, {} borrowers", total, borrowers.len());

    Ok(())
}

/// Finds the borrow opened by the given credit sale.
async fn borrow_for_sale(
    db: &Database,
    sale_id: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let id: Option<String> = sqlx::query_scalar("SELECT id FROM borrows WHERE sale_id = ?1")
        .bind(sale_id)
        .fetch_optional(db.pool())
        .await?;
    Ok(id)
}
