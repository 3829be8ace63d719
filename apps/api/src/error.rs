//! Error types for the HTTP API.
//!
//! ## Mapping
//! ```text
//! ┌──────────────────────────────────┬────────┬────────────────────────────┐
//! │ source                           │ status │ code                       │
//! ├──────────────────────────────────┼────────┼────────────────────────────┤
//! │ ValidationError / bad body/query │ 400    │ VALIDATION_ERROR           │
//! │ duplicate username, unknown FK   │ 400    │ VALIDATION_ERROR           │
//! │ InsufficientStock                │ 400    │ INSUFFICIENT_STOCK         │
//! │ ProductNotStocked                │ 400    │ PRODUCT_NOT_STOCKED        │
//! │ missing/invalid token, bad login │ 401    │ UNAUTHORIZED               │
//! │ AccessError                      │ 403    │ FORBIDDEN                  │
//! │ DbError::NotFound                │ 404    │ NOT_FOUND                  │
//! │ Timeout / Busy / PoolExhausted   │ 503    │ SERVICE_UNAVAILABLE        │
//! │ everything else                  │ 500    │ INTERNAL_ERROR (generic)   │
//! └──────────────────────────────────┴────────┴────────────────────────────┘
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use branchline_core::error::{CoreError, ValidationError};
use branchline_core::AccessError;
use branchline_db::DbError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Machine-readable error code carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    ProductNotStocked,
    Unauthorized,
    Forbidden,
    NotFound,
    ServiceUnavailable,
    InternalError,
}

/// JSON error body: `{ "code": "...", "message": "..." }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{message}")]
    Stock { code: ErrorCode, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Stock { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::ValidationError,
            ApiError::Stock { code, .. } => *code,
            ApiError::Unauthorized(_) => ErrorCode::Unauthorized,
            ApiError::Forbidden(_) => ErrorCode::Forbidden,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Unavailable(_) => ErrorCode::ServiceUnavailable,
            ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The message shown to the client. Internal detail stays in the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::Stock { message, .. } => message.clone(),
            ApiError::Unavailable(_) => "Service temporarily unavailable, please retry".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => error!(error = %detail, "Request failed"),
            ApiError::Unavailable(detail) => warn!(error = %detail, "Store unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            code: self.code(),
            message: self.public_message(),
        };

        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ValidationError::from(errors).into()
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotStocked { .. } => ApiError::Stock {
                code: ErrorCode::ProductNotStocked,
                message: err.to_string(),
            },
            CoreError::InsufficientStock { .. } => ApiError::Stock {
                code: ErrorCode::InsufficientStock,
                message: err.to_string(),
            },
            CoreError::Access(access) => access.into(),
            CoreError::Validation(validation) => validation.into(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::Validation(err.to_string()),
            DbError::ForeignKeyViolation { .. } => {
                warn!(error = %err, "Rejected write with a dangling reference");
                ApiError::Validation("Referenced record does not exist".to_string())
            }
            DbError::CheckViolation { .. } => {
                warn!(error = %err, "Rejected write breaking a table constraint");
                ApiError::Validation("Value is out of the allowed range".to_string())
            }
            ref transient if transient.is_transient() => ApiError::Unavailable(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
