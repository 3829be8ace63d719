//! Branch CRUD. Everyone reads; admins write.

use axum::{
    extract::{Path, State},
    Json,
};
use branchline_core::schema::{BranchUpdate, NewBranch};
use branchline_core::types::{AuditEventType, Branch};
use tracing::info;

use crate::error::ApiError;
use crate::extract::{AuthUser, ValidatedJson};
use crate::routes::{audit, Created, EntityId};
use crate::AppState;

/// `GET /api/branches`
pub async fn list(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
) -> Result<Json<Vec<Branch>>, ApiError> {
    Ok(Json(state.db.branches().list().await?))
}

/// `GET /api/branches/{id}`
pub async fn get(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Branch>, ApiError> {
    Ok(Json(state.db.branches().get(id).await?))
}

/// `POST /api/branches` (admin)
pub async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(branch): ValidatedJson<NewBranch>,
) -> Result<Json<Created>, ApiError> {
    actor.require_admin()?;

    let branch_id = state.db.branches().create(&branch).await?;

    info!(branch_id, name = %branch.name, by = %actor.username, "Branch created");
    audit(
        &state,
        AuditEventType::BranchCreated,
        Some(&actor.username),
        Some(branch_id),
        serde_json::json!({ "name": branch.name }),
    )
    .await;

    Ok(Json(Created::completed(EntityId::Branch(branch_id))))
}

/// `PUT /api/branches/{id}` (admin)
pub async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(update): ValidatedJson<BranchUpdate>,
) -> Result<Json<Created>, ApiError> {
    actor.require_admin()?;

    let branch = state.db.branches().update(id, &update).await?;

    info!(branch_id = branch.id, by = %actor.username, "Branch updated");
    audit(
        &state,
        AuditEventType::BranchUpdated,
        Some(&actor.username),
        Some(branch.id),
        serde_json::json!({ "name": branch.name }),
    )
    .await;

    Ok(Json(Created::updated(EntityId::Branch(branch.id))))
}
