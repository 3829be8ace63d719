//! Inventory listing and stock additions.

use axum::{extract::State, Json};
use branchline_core::schema::{InventoryAddition, InventoryFilter};
use branchline_core::types::{AuditEventType, InventoryEntry};

use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::routes::{audit, Created, EntityId};
use crate::AppState;

/// `GET /api/inventory?branch_id=&product_id=`
pub async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(filter): ApiQuery<InventoryFilter>,
) -> Result<Json<Vec<InventoryEntry>>, ApiError> {
    let filter = InventoryFilter {
        branch_id: actor.scope_branch(filter.branch_id),
        ..filter
    };

    Ok(Json(state.db.inventory().list(&filter).await?))
}

/// `POST /api/inventory` (admin or manager of the branch)
///
/// Adds to the existing quantity; creates the record when there is none.
pub async fn add(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(addition): ValidatedJson<InventoryAddition>,
) -> Result<Json<Created>, ApiError> {
    actor.require_inventory_writer(addition.branch_id)?;

    let inventory_id = state.db.inventory().add(&addition).await?;

    audit(
        &state,
        AuditEventType::InventoryAdded,
        Some(&actor.username),
        Some(inventory_id),
        serde_json::json!({
            "branch_id": addition.branch_id,
            "product_id": addition.product_id,
            "quantity": addition.quantity,
        }),
    )
    .await;

    Ok(Json(Created::completed(EntityId::Inventory(inventory_id))))
}
