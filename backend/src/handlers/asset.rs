//! HTTP handlers for physical asset endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::asset::{AssetQuery, AssetService};
use crate::AppState;
use shared::{PaginatedResponse, PhysicalAsset};

/// List physical assets
pub async fn list_assets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AssetQuery>,
) -> AppResult<Json<PaginatedResponse<PhysicalAsset>>> {
    let service = AssetService::new(state.db);
    Ok(Json(service.list(&user, query).await?))
}
