//! # Branchline API
//!
//! JSON HTTP server for multi-branch sales and inventory.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Branchline API                                  │
//! │                                                                         │
//! │  request ──► TraceLayer ──► CorsLayer ──► Router                        │
//! │                                             │                           │
//! │                      ┌──────────────────────┼──────────────────────┐    │
//! │                      ▼                      ▼                      ▼    │
//! │               AuthUser (JWT)        ValidatedJson<T>        ApiQuery<T> │
//! │                      │                      │                      │    │
//! │                      └──────────► handler ◄─┴──────────────────────┘    │
//! │                                     │                                   │
//! │                   Actor policy (core) ──► repositories (db)             │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │                   Json<T>  or  ApiError { code, message }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: defaults, optional `branchline.toml`, `BRANCHLINE_*`
//! environment variables.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use branchline_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Re-exports
pub use auth::JwtManager;
pub use config::ApiConfig;
pub use error::ApiError;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_lifetime_secs);
        AppState {
            db,
            jwt,
            config: Arc::new(config),
        }
    }
}

/// Builds the full router with middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.cors_allow_any_origin {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
