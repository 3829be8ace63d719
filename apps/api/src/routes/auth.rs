//! Login and registration.

use axum::{extract::State, Json};
use branchline_core::schema::{Credentials, NewUser};
use branchline_core::types::{AuditEventType, Role, User};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::error::ApiError;
use crate::extract::{AuthUser, ValidatedJson};
use crate::routes::audit;
use crate::AppState;

/// Same message whether the username exists or not.
const LOGIN_FAILED: &str = "Invalid username or password";

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub branch_id: Option<i64>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            branch_id: user.branch_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: i64,
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(credentials): ValidatedJson<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.db.users().find_by_username(&credentials.username).await?;

    let user = match user {
        Some(user) if verify_password(&credentials.password, &user.password_hash) => user,
        _ => {
            warn!(username = %credentials.username, "Login failed");
            audit(
                &state,
                AuditEventType::LoginFailed,
                Some(&credentials.username),
                None,
                serde_json::json!({}),
            )
            .await;
            return Err(ApiError::Unauthorized(LOGIN_FAILED.to_string()));
        }
    };

    let token = state.jwt.issue(&user)?;

    info!(user_id = user.id, username = %user.username, role = %user.role, "Login succeeded");
    audit(
        &state,
        AuditEventType::LoginSuccess,
        Some(&user.username),
        Some(user.id),
        serde_json::json!({ "role": user.role.as_str() }),
    )
    .await;

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserProfile::from(&user),
    }))
}

/// `POST /api/register` (admin)
pub async fn register(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(new_user): ValidatedJson<NewUser>,
) -> Result<Json<RegisterResponse>, ApiError> {
    actor.require_admin()?;

    let password_hash = hash_password(&new_user.password)?;
    let user_id = state.db.users().create(&new_user, &password_hash).await?;

    info!(user_id, username = %new_user.username, role = %new_user.role, by = %actor.username, "User registered");
    audit(
        &state,
        AuditEventType::UserCreated,
        Some(&actor.username),
        Some(user_id),
        serde_json::json!({
            "username": new_user.username,
            "role": new_user.role.as_str(),
            "branch_id": new_user.branch_id,
        }),
    )
    .await;

    Ok(Json(RegisterResponse {
        message: "User registered successfully",
        user_id,
    }))
}
