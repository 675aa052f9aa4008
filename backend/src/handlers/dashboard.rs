//! HTTP handler for the dashboard

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::{DashboardService, DashboardSummary};
use crate::AppState;

/// Counters scoped to the caller's role and organization
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardSummary>> {
    let service = DashboardService::new(state.db);
    Ok(Json(service.summary(&user).await?))
}
