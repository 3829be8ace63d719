//! User administration.

use axum::{
    extract::{Path, State},
    Json,
};
use branchline_core::schema::UserUpdate;
use branchline_core::types::{AuditEventType, User};
use tracing::info;

use crate::auth::hash_password;
use crate::error::ApiError;
use crate::extract::{AuthUser, ValidatedJson};
use crate::routes::{audit, Created, EntityId};
use crate::AppState;

/// `GET /api/users` (admin)
pub async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<User>>, ApiError> {
    actor.require_admin()?;
    Ok(Json(state.db.users().list().await?))
}

/// `GET /api/users/{id}` (admin or the user themself)
pub async fn get(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    actor.authorize_user_read(id)?;
    Ok(Json(state.db.users().get(id).await?))
}

/// `PUT /api/users/{id}` (admin)
pub async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(update): ValidatedJson<UserUpdate>,
) -> Result<Json<Created>, ApiError> {
    actor.require_admin()?;

    let password_hash = match &update.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    let user = state
        .db
        .users()
        .update(id, &update, password_hash.as_deref())
        .await?;

    info!(user_id = user.id, by = %actor.username, "User updated");
    audit(
        &state,
        AuditEventType::UserUpdated,
        Some(&actor.username),
        Some(user.id),
        serde_json::json!({
            "role": user.role.as_str(),
            "branch_id": user.branch_id,
            "password_changed": password_hash.is_some(),
        }),
    )
    .await;

    Ok(Json(Created::updated(EntityId::User(user.id))))
}
