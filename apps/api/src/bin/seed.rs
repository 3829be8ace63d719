//! # Development Seed
//!
//! Creates an admin account, a few branches, products and stock so a fresh
//! database is usable right away.
//!
//! ```text
//! cargo run -p branchline-api --bin seed
//! ```
//!
//! Safe to run twice: it does nothing if an admin already exists. The admin
//! password comes from `BRANCHLINE_SEED_ADMIN_PASSWORD` (default `admin123`).

use anyhow::Context;
use branchline_api::auth::hash_password;
use branchline_api::ApiConfig;
use branchline_core::money::Money;
use branchline_core::schema::{InventoryAddition, NewBranch, NewProduct, NewUser};
use branchline_core::types::Role;
use branchline_db::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

const BRANCHES: [(&str, &str, &str); 3] = [
    ("Central", "100 Main Street", "Laura Gomez"),
    ("Riverside", "12 River Road", "Tomas Diaz"),
    ("Hillcrest", "7 Summit Avenue", "Mina Park"),
];

const PRODUCTS: [(&str, &str, i64); 6] = [
    ("Cola 330ml", "Drinks", 199),
    ("Sparkling Water 500ml", "Drinks", 149),
    ("Potato Chips", "Snacks", 250),
    ("Chocolate Bar", "Snacks", 175),
    ("Notebook A5", "Stationery", 399),
    ("Ballpoint Pen", "Stationery", 99),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ApiConfig::load().context("Failed to load configuration")?;
    let db = Database::new(config.db_config())
        .await
        .context("Failed to open database")?;

    if db.users().count_with_role(Role::Admin).await? > 0 {
        info!("Admin already present, nothing to seed");
        return Ok(());
    }

    let admin_password =
        std::env::var("BRANCHLINE_SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let admin = NewUser {
        username: "admin".to_string(),
        password: admin_password,
        full_name: "System Administrator".to_string(),
        email: None,
        role: Role::Admin,
        branch_id: None,
    };
    let hash = hash_password(&admin.password)?;
    db.users().create(&admin, &hash).await?;
    info!(username = %admin.username, "Admin created");

    let mut branch_ids = Vec::new();
    for (name, address, manager) in BRANCHES {
        let id = db
            .branches()
            .create(&NewBranch {
                name: name.to_string(),
                address: address.to_string(),
                phone: None,
                manager: Some(manager.to_string()),
            })
            .await?;
        branch_ids.push(id);
    }

    let mut product_ids = Vec::new();
    for (name, category, cents) in PRODUCTS {
        let id = db
            .products()
            .create(&NewProduct {
                name: name.to_string(),
                description: None,
                category: Some(category.to_string()),
                price: Money::from_cents(cents),
            })
            .await?;
        product_ids.push(id);
    }

    for (b, branch_id) in branch_ids.iter().enumerate() {
        for (p, product_id) in product_ids.iter().enumerate() {
            // uneven quantities so low-stock shows up in the metrics
            let quantity = ((b * 7 + p * 5) % 40 + 3) as i64;
            db.inventory()
                .add(&InventoryAddition {
                    branch_id: *branch_id,
                    product_id: *product_id,
                    quantity,
                })
                .await?;
        }
    }

    info!(
        branches = branch_ids.len(),
        products = product_ids.len(),
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
