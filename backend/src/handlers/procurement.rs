//! HTTP handlers for procurement endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::procurement::{CreateProcurementInput, ProcurementQuery, ProcurementService};
use crate::handlers::request::TransitionBody;
use crate::services::request::TransitionInput;
use crate::AppState;
use shared::{
    ActionResponse, PaginatedResponse, Procurement, ProcurementAction, ProcurementDetail,
    UserRole, PROCUREMENT_SUBMITTERS,
};

const PROCUREMENT_READERS: &[UserRole] = &[
    UserRole::SuperAdmin,
    UserRole::WarehouseStaff,
    UserRole::FacultyAdmin,
];

/// Open a procurement
pub async fn create_procurement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProcurementInput>,
) -> AppResult<Json<ActionResponse<ProcurementDetail>>> {
    user.require_role(PROCUREMENT_SUBMITTERS)?;
    input.validate()?;

    let service = ProcurementService::new(state.db);
    let detail = service.create(&user, input).await?;
    Ok(Json(ActionResponse::ok("Procurement opened", detail)))
}

pub async fn list_procurements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ProcurementQuery>,
) -> AppResult<Json<PaginatedResponse<Procurement>>> {
    user.require_role(PROCUREMENT_READERS)?;

    let service = ProcurementService::new(state.db);
    Ok(Json(service.list(&user, query).await?))
}

pub async fn get_procurement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(procurement_id): Path<Uuid>,
) -> AppResult<Json<ProcurementDetail>> {
    user.require_role(PROCUREMENT_READERS)?;

    let service = ProcurementService::new(state.db);
    Ok(Json(service.get(&user, procurement_id).await?))
}

async fn apply(
    state: AppState,
    user: AuthUser,
    procurement_id: Uuid,
    action: ProcurementAction,
    input: TransitionInput,
) -> AppResult<Json<ActionResponse<Procurement>>> {
    let service = ProcurementService::new(state.db.clone());
    let procurement = service
        .transition(&user, procurement_id, action, input, &state.config.assets)
        .await?;
    Ok(Json(ActionResponse::ok(action.success_message(), procurement)))
}

pub async fn approve_procurement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(procurement_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Procurement>>> {
    apply(state, user, procurement_id, ProcurementAction::Approve, input).await
}

pub async fn reject_procurement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(procurement_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Procurement>>> {
    apply(state, user, procurement_id, ProcurementAction::Reject, input).await
}

/// Receive the goods into the warehouse
pub async fn complete_procurement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(procurement_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Procurement>>> {
    apply(state, user, procurement_id, ProcurementAction::Complete, input).await
}
