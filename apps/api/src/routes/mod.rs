//! # Routes
//!
//! ```text
//! GET  /                          info::root
//! GET  /health                    info::health
//! POST /api/login                 auth::login
//! POST /api/register              auth::register          (admin)
//! GET  /api/users                 users::list             (admin)
//! GET  /api/users/{id}            users::get              (admin or self)
//! PUT  /api/users/{id}            users::update           (admin)
//! GET  /api/sales                 sales::list             (scoped)
//! POST /api/sales                 sales::create           (own branch)
//! GET  /api/sales/{id}            sales::get              (own branch)
//! GET  /api/branches              branches::list
//! POST /api/branches              branches::create        (admin)
//! GET  /api/branches/{id}         branches::get
//! PUT  /api/branches/{id}         branches::update        (admin)
//! GET  /api/inventory             inventory::list         (scoped)
//! POST /api/inventory             inventory::add          (admin/manager)
//! GET  /api/products              products::list
//! POST /api/products              products::create        (admin)
//! GET  /api/products/categories   products::categories
//! GET  /api/products/{id}         products::get
//! PUT  /api/products/{id}         products::update        (admin)
//! GET  /api/metrics/sales         metrics::sales          (scoped)
//! GET  /api/metrics/performance   metrics::performance    (scoped)
//! GET  /api/metrics/inventory     metrics::inventory      (scoped)
//! ```

pub mod auth;
pub mod branches;
pub mod info;
pub mod inventory;
pub mod metrics;
pub mod products;
pub mod sales;
pub mod users;

use axum::routing::{get, post};
use axum::Router;
use branchline_core::types::AuditEventType;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(info::root))
        .route("/health", get(info::health))
        .route("/api/login", post(auth::login))
        .route("/api/register", post(auth::register))
        .route("/api/users", get(users::list))
        .route("/api/users/{id}", get(users::get).put(users::update))
        .route("/api/sales", get(sales::list).post(sales::create))
        .route("/api/sales/{id}", get(sales::get))
        .route("/api/branches", get(branches::list).post(branches::create))
        .route("/api/branches/{id}", get(branches::get).put(branches::update))
        .route("/api/inventory", get(inventory::list).post(inventory::add))
        .route("/api/products", get(products::list).post(products::create))
        .route("/api/products/categories", get(products::categories))
        .route("/api/products/{id}", get(products::get).put(products::update))
        .route("/api/metrics/sales", get(metrics::sales))
        .route("/api/metrics/performance", get(metrics::performance))
        .route("/api/metrics/inventory", get(metrics::inventory))
}

// =============================================================================
// Shared Response Shapes
// =============================================================================

/// `{ "<entity>_id": n, "status": "completed" | "updated" }`
#[derive(Debug, Serialize)]
pub struct Created {
    #[serde(flatten)]
    pub id: EntityId,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub enum EntityId {
    #[serde(rename = "sale_id")]
    Sale(i64),
    #[serde(rename = "branch_id")]
    Branch(i64),
    #[serde(rename = "product_id")]
    Product(i64),
    #[serde(rename = "inventory_id")]
    Inventory(i64),
    #[serde(rename = "user_id")]
    User(i64),
}

impl Created {
    pub fn completed(id: EntityId) -> Self {
        Created { id, status: "completed" }
    }

    pub fn updated(id: EntityId) -> Self {
        Created { id, status: "updated" }
    }
}

/// Records an audit event after the operation it describes has committed.
///
/// A failure here is logged and swallowed: the caller's operation already
/// succeeded.
pub(crate) async fn audit(
    state: &AppState,
    event: AuditEventType,
    actor: Option<&str>,
    entity_id: Option<i64>,
    details: serde_json::Value,
) {
    if let Err(e) = state.db.audit().record(event, actor, entity_id, details).await {
        warn!(event = %event, error = %e, "Failed to record audit event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_wire_shape() {
        let json = serde_json::to_value(Created::completed(EntityId::Sale(12))).unwrap();
        assert_eq!(json, serde_json::json!({ "sale_id": 12, "status": "completed" }));

        let json = serde_json::to_value(Created::updated(EntityId::Branch(3))).unwrap();
        assert_eq!(json, serde_json::json!({ "branch_id": 3, "status": "updated" }));
    }
}
