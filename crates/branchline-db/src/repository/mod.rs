//! # Repository Module
//!
//! Database repository implementations for Branchline.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.sales().record(&new_sale, &actor)                           │
//! │       ▼                                                                 │
//! │  SaleRepository                                                         │
//! │  ├── record(&self, sale, actor)   ← one transaction                     │
//! │  ├── get(&self, id)                                                     │
//! │  └── list(&self, filter)                                                │
//! │       │                                                                 │
//! │       │  SQL (runtime-checked, bound parameters only)                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Every public method runs under the pool's statement timeout.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Accounts and credentials lookup
//! - [`branch::BranchRepository`] - Branch CRUD
//! - [`product::ProductRepository`] - Catalog CRUD and filters
//! - [`inventory::InventoryRepository`] - Stock listing and additive upsert
//! - [`sale::SaleRepository`] - Sale Recorder and sale queries
//! - [`report::ReportRepository`] - Metrics rollups
//! - [`audit::AuditRepository`] - Append-only audit log

pub mod audit;
pub mod branch;
pub mod inventory;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod fixtures {
    use branchline_core::money::Money;
    use branchline_core::schema::{InventoryAddition, NewBranch, NewProduct, NewUser};
    use branchline_core::types::Role;

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn branch(db: &Database, name: &str) -> i64 {
        db.branches()
            .create(&NewBranch {
                name: name.to_string(),
                address: format!("{} High Street", name),
                phone: None,
                manager: Some("Pat Lee".to_string()),
            })
            .await
            .unwrap()
    }

    pub async fn product(db: &Database, name: &str, cents: i64, category: Option<&str>) -> i64 {
        db.products()
            .create(&NewProduct {
                name: name.to_string(),
                description: None,
                category: category.map(str::to_string),
                price: Money::from_cents(cents),
            })
            .await
            .unwrap()
    }

    pub async fn user(db: &Database, username: &str, role: Role, branch_id: Option<i64>) -> i64 {
        db.users()
            .create(
                &NewUser {
                    username: username.to_string(),
                    password: "unused-in-db".to_string(),
                    full_name: format!("{} Tester", username),
                    email: None,
                    role,
                    branch_id,
                },
                "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
            )
            .await
            .unwrap()
    }

    pub async fn stock(db: &Database, branch_id: i64, product_id: i64, quantity: i64) -> i64 {
        db.inventory()
            .add(&InventoryAddition {
                branch_id,
                product_id,
                quantity,
            })
            .await
            .unwrap()
    }
}
