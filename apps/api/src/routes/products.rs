//! Product catalog. Everyone reads; admins write.

use axum::{
    extract::{Path, State},
    Json,
};
use branchline_core::schema::{NewProduct, ProductFilter, ProductUpdate};
use branchline_core::types::{AuditEventType, Product};
use tracing::info;

use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::routes::{audit, Created, EntityId};
use crate::AppState;

/// `GET /api/products?category=&name=`
pub async fn list(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.db.products().list(&filter).await?))
}

/// `GET /api/products/categories`
pub async fn categories(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.db.products().categories().await?))
}

/// `GET /api/products/{id}`
pub async fn get(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.db.products().get(id).await?))
}

/// `POST /api/products` (admin)
pub async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(product): ValidatedJson<NewProduct>,
) -> Result<Json<Created>, ApiError> {
    actor.require_admin()?;

    let product_id = state.db.products().create(&product).await?;

    info!(product_id, name = %product.name, price = %product.price, "Product created");
    audit(
        &state,
        AuditEventType::ProductCreated,
        Some(&actor.username),
        Some(product_id),
        serde_json::json!({ "name": product.name, "price": product.price }),
    )
    .await;

    Ok(Json(Created::completed(EntityId::Product(product_id))))
}

/// `PUT /api/products/{id}` (admin)
pub async fn update(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(update): ValidatedJson<ProductUpdate>,
) -> Result<Json<Created>, ApiError> {
    actor.require_admin()?;

    let product = state.db.products().update(id, &update).await?;

    info!(product_id = product.id, by = %actor.username, "Product updated");
    audit(
        &state,
        AuditEventType::ProductUpdated,
        Some(&actor.username),
        Some(product.id),
        serde_json::json!({ "name": product.name, "price": product.price }),
    )
    .await;

    Ok(Json(Created::updated(EntityId::Product(product.id))))
}
