//! Sales: listing, detail, and the create path into the Sale Recorder.

use axum::{
    extract::{Path, State},
    Json,
};
use branchline_core::schema::{NewSale, SalesFilter};
use branchline_core::types::Sale;
use tracing::debug;

use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::routes::{Created, EntityId};
use crate::AppState;

/// `GET /api/sales?branch_id=&date_from=&date_to=`
///
/// Staff assigned to a branch only ever see that branch.
pub async fn list(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(filter): ApiQuery<SalesFilter>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    let filter = SalesFilter {
        branch_id: actor.scope_branch(filter.branch_id),
        ..filter
    };
    debug!(user = %actor.username, branch_id = ?filter.branch_id, "Listing sales");

    Ok(Json(state.db.sales().list(&filter).await?))
}

/// `POST /api/sales`
///
/// The audit row is written inside the sale transaction, not here.
pub async fn create(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidatedJson(sale): ValidatedJson<NewSale>,
) -> Result<Json<Created>, ApiError> {
    actor.authorize_branch(sale.branch_id)?;

    let sale_id = state.db.sales().record(&sale, &actor).await?;
    Ok(Json(Created::completed(EntityId::Sale(sale_id))))
}

/// `GET /api/sales/{id}`
pub async fn get(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Sale>, ApiError> {
    let sale = state.db.sales().get(id).await?;
    actor.authorize_branch(sale.branch_id)?;
    Ok(Json(sale))
}
