//! # Seed Data Generator
//!
//! Populates the database with a demo shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed into the default database
//! cargo run -p duka-db --bin seed
//!
//! # Specify database path
//! cargo run -p duka-db --bin seed -- --db ./data/duka.db
//!
//! # Also record a handful of sample sales for today
//! cargo run -p duka-db --bin seed -- --with-sales
//! ```
//!
//! ## Generated Data
//! Creates one business ("Mama Njeri's Duka"), a realistic small-shop
//! catalog (staples, beverages, household goods with KSh prices), and a
//! few linked customers. With `--with-sales`, records cash, M-Pesa, and
//! debt sales against today's entry so every ledger path has data.

use std::env;

use duka_core::{Money, PaymentMethod};
use duka_db::repository::inventory::NewInventoryItem;
use duka_db::{Database, DbConfig};

/// (name, cost KSh cents, retail KSh cents, stock, unit, category)
const CATALOG: &[(&str, i64, i64, i64, &str, &str)] = &[
    ("maize flour 2kg", 14_500, 17_900, 40, "packet", "Staples"),
    ("wheat flour 2kg", 15_000, 18_500, 30, "packet", "Staples"),
    ("sugar 1kg", 13_000, 15_500, 50, "packet", "Staples"),
    ("rice 1kg", 14_000, 17_000, 35, "packet", "Staples"),
    ("cooking oil 1l", 28_000, 32_000, 24, "bottle", "Staples"),
    ("salt 500g", 2_000, 3_000, 60, "packet", "Staples"),
    ("bread", 5_500, 6_500, 20, "loaf", "Bakery"),
    ("milk 500ml", 4_500, 5_500, 48, "packet", "Dairy"),
    ("eggs", 1_300, 1_800, 90, "pcs", "Dairy"),
    ("soda 500ml", 4_500, 6_000, 72, "bottle", "Beverages"),
    ("drinking water 1l", 3_500, 5_000, 36, "bottle", "Beverages"),
    ("tea leaves 250g", 9_000, 11_500, 25, "packet", "Beverages"),
    ("bar soap", 9_500, 12_000, 30, "pcs", "Household"),
    ("detergent 500g", 11_000, 14_000, 22, "packet", "Household"),
    ("matchbox", 500, 1_000, 100, "pcs", "Household"),
    ("tissue paper", 3_000, 4_500, 40, "roll", "Household"),
    ("kerosene 1l", 11_500, 13_500, 18, "litre", "Fuel"),
    ("sukuma wiki bunch", 1_500, 3_000, 25, "bunch", "Fresh"),
    ("tomatoes", 1_000, 2_000, 60, "pcs", "Fresh"),
    ("onions", 800, 1_500, 70, "pcs", "Fresh"),
];

/// (full name, phone, email)
const CUSTOMERS: &[(&str, &str, Option<&str>)] = &[
    ("Wanjiku Kamau", "+254712345678", None),
    ("Otieno Ochieng", "+254723456789", Some("otieno@example.com")),
    ("Fatuma Hassan", "+254734567890", None),
    ("Kipchoge Rotich", "+254745678901", None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./duka_dev.db");
    let mut with_sales = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--with-sales" | "-s" => {
                with_sales = true;
            }
            "--help" | "-h" => {
                println!("Duka Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./duka_dev.db)");
                println!("  -s, --with-sales   Also record sample sales for today");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Duka Ledger Seed Data Generator");
    println!("==================================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check for existing data
    let existing = db.businesses().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} businesses", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let business = db.businesses().create("Mama Njeri's Duka", Some("Njeri Mwangi")).await?;
    println!("✓ Business created: {} ({})", business.name, business.id);

    println!();
    println!("Stocking catalog...");
    let inventory = db.inventory();
    let mut item_ids = Vec::with_capacity(CATALOG.len());
    for (name, cost, retail, stock, unit, category) in CATALOG {
        let item = inventory
            .add_item(
                &business.id,
                NewInventoryItem {
                    name: (*name).to_string(),
                    cost_price_cents: *cost,
                    retail_price_cents: *retail,
                    quantity_available: *stock,
                    unit: Some((*unit).to_string()),
                    category: Some((*category).to_string()),
                    image_url: None,
                },
            )
            .await?;
        println!(
            "  {} @ {} ({} in stock)",
            item.name,
            Money::from_cents(item.retail_price_cents),
            item.quantity_available
        );
        item_ids.push(item.id);
    }

    println!();
    println!("Registering customers...");
    let customers = db.customers();
    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (full_name, phone, email) in CUSTOMERS {
        let customer = customers
            .add_customer(&business.id, full_name, phone, *email)
            .await?;
        println!("  {} ({})", customer.full_name, customer.phone_number);
        customer_ids.push(customer.id);
    }

    if with_sales {
        println!();
        println!("Recording sample sales...");
        let ledger = db.ledger();
        ledger.start_new_day(&business.id).await?;

        // A mix of channels plus one debt so the day has every total
        let samples: &[(usize, i64, PaymentMethod, Option<usize>)] = &[
            (0, 2, PaymentMethod::Cash, None),
            (7, 3, PaymentMethod::Cash, None),
            (9, 6, PaymentMethod::Mpesa, None),
            (4, 1, PaymentMethod::Mpesa, None),
            (2, 2, PaymentMethod::Debt, Some(0)),
            (6, 1, PaymentMethod::Debt, Some(0)),
        ];

        for (item_idx, qty, method, cust_idx) in samples {
            let customer = cust_idx.map(|c| customer_ids[c].as_str());
            let outcome = ledger
                .record_sale(&business.id, &item_ids[*item_idx], *qty, *method, customer)
                .await?;
            println!(
                "  {} for {} ({}){}",
                qty,
                outcome.amount,
                method.as_str(),
                if outcome.merged { " [merged]" } else { "" }
            );
        }
    }

    println!();
    println!("✓ Seed complete!");
    println!("  Business id: {}", business.id);

    Ok(())
}
