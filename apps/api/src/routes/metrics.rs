//! Metrics endpoints. All three are branch-scoped for assigned staff.

use axum::{extract::State, Json};
use branchline_core::report::{BranchPerformance, InventoryMetrics, Period, SalesMetrics};
use branchline_core::schema::MetricsFilter;
use chrono::Utc;

use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser};
use crate::AppState;

/// `GET /api/metrics/sales?period=&branch_id=`
pub async fn sales(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(filter): ApiQuery<MetricsFilter>,
) -> Result<Json<SalesMetrics>, ApiError> {
    let period = Period::parse(filter.period.as_deref());
    let branch_id = actor.scope_branch(filter.branch_id);
    let today = Utc::now().date_naive();

    Ok(Json(state.db.reports().sales_metrics(period, branch_id, today).await?))
}

/// `GET /api/metrics/performance`
///
/// No branch parameter: admins see every branch, assigned staff their own.
pub async fn performance(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<BranchPerformance>, ApiError> {
    let branch_id = actor.scope_branch(None);
    let today = Utc::now().date_naive();

    Ok(Json(state.db.reports().branch_performance(branch_id, today).await?))
}

/// `GET /api/metrics/inventory?branch_id=`
pub async fn inventory(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ApiQuery(filter): ApiQuery<MetricsFilter>,
) -> Result<Json<InventoryMetrics>, ApiError> {
    let branch_id = actor.scope_branch(filter.branch_id);
    Ok(Json(state.db.reports().inventory_metrics(branch_id).await?))
}
