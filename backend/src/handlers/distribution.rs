//! HTTP handlers for asset distribution endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::asset::AssetService;
use crate::services::distribution::{
    DistributionQuery, DistributionService, DraftInput, ExecutionResult, PendingTarget,
    ReceiptResult, ReceiveInput,
};
use crate::AppState;
use shared::{
    ActionResponse, Distribution, DistributionDetail, DistributionStatus, PaginatedResponse,
    DISTRIBUTION_MANAGERS, RECEIPT_CONFIRMERS,
};

#[derive(Debug, Deserialize)]
pub struct AssetExportQuery {
    pub format: Option<String>,
}

/// Create a distribution draft
pub async fn create_distribution(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<DraftInput>,
) -> AppResult<Json<ActionResponse<DistributionDetail>>> {
    user.require_role(DISTRIBUTION_MANAGERS)?;
    input.validate()?;

    let service = DistributionService::new(state.db);
    let detail = service.create_draft(&user, input).await?;
    Ok(Json(ActionResponse::ok("Distribution draft created", detail)))
}

/// List distributions
pub async fn list_distributions(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<DistributionQuery>,
) -> AppResult<Json<PaginatedResponse<Distribution>>> {
    let service = DistributionService::new(state.db);
    Ok(Json(service.list(query).await?))
}

/// Get a distribution with its targets
pub async fn get_distribution(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(distribution_id): Path<Uuid>,
) -> AppResult<Json<DistributionDetail>> {
    let service = DistributionService::new(state.db);
    Ok(Json(service.get(distribution_id).await?))
}

/// Edit a draft
pub async fn update_distribution(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(distribution_id): Path<Uuid>,
    Json(input): Json<DraftInput>,
) -> AppResult<Json<ActionResponse<DistributionDetail>>> {
    user.require_role(DISTRIBUTION_MANAGERS)?;
    input.validate()?;

    let service = DistributionService::new(state.db);
    let detail = service.update_draft(&user, distribution_id, input).await?;
    Ok(Json(ActionResponse::ok("Distribution draft updated", detail)))
}

/// Delete a draft
pub async fn delete_distribution(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(distribution_id): Path<Uuid>,
) -> AppResult<Json<ActionResponse<()>>> {
    user.require_role(DISTRIBUTION_MANAGERS)?;

    let service = DistributionService::new(state.db);
    service.delete_draft(&user, distribution_id).await?;
    Ok(Json(ActionResponse::done("Distribution draft deleted")))
}

/// Execute a draft and ship its assets
pub async fn execute_distribution(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(distribution_id): Path<Uuid>,
) -> AppResult<Json<ActionResponse<ExecutionResult>>> {
    user.require_role(DISTRIBUTION_MANAGERS)?;

    let service = DistributionService::new(state.db.clone());
    let result = service
        .execute(&user, distribution_id, &state.config.assets)
        .await?;
    let message = format!(
        "Distribution shipped with {} asset(s) in transit",
        result.assets_created
    );
    Ok(Json(ActionResponse::ok(message, result)))
}

/// Assets generated by a distribution, as JSON or as CSV for label printing
pub async fn list_distribution_assets(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(distribution_id): Path<Uuid>,
    Query(query): Query<AssetExportQuery>,
) -> AppResult<Response> {
    let service = AssetService::new(state.db);
    let labels = service.labels_for_distribution(distribution_id).await?;

    if query.format.as_deref() == Some("csv") {
        let csv = AssetService::labels_to_csv(&labels)?;
        let disposition = format!("attachment; filename=\"distribution-{}-assets.csv\"", distribution_id);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(labels).into_response())
    }
}

/// Confirm receipt of units for one target
pub async fn receive_target(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(target_id): Path<Uuid>,
    Json(input): Json<ReceiveInput>,
) -> AppResult<Json<ActionResponse<ReceiptResult>>> {
    user.require_role(RECEIPT_CONFIRMERS)?;

    let service = DistributionService::new(state.db);
    let result = service.receive(&user, target_id, input).await?;
    let message = if result.distribution_status == DistributionStatus::Completed {
        "Receipt confirmed; distribution completed"
    } else {
        "Receipt confirmed"
    };
    Ok(Json(ActionResponse::ok(message, result)))
}

/// Targets of a room still awaiting receipt
pub async fn list_pending_for_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<Vec<PendingTarget>>> {
    let service = DistributionService::new(state.db);
    Ok(Json(service.pending_for_room(&user, room_id).await?))
}
