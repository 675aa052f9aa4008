//! HTTP handlers for consumable request endpoints

use axum::{
    body::Bytes,
    extract::{FromRequest, Path, Query, Request as HttpRequest, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::request::{CreateRequestInput, RequestQuery, RequestService, TransitionInput};
use crate::AppState;
use shared::{
    ActionResponse, PaginatedResponse, Request, RequestAction, RequestDetail, REQUEST_SUBMITTERS,
};

/// Submit a request
pub async fn create_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateRequestInput>,
) -> AppResult<Json<ActionResponse<RequestDetail>>> {
    user.require_role(REQUEST_SUBMITTERS)?;
    input.validate()?;

    let service = RequestService::new(state.db);
    let detail = service.create(&user, input).await?;
    Ok(Json(ActionResponse::ok("Request submitted", detail)))
}

/// List requests in the caller's scope
pub async fn list_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<PaginatedResponse<Request>>> {
    let service = RequestService::new(state.db);
    Ok(Json(service.list(&user, query).await?))
}

/// Get a request with items and timeline
pub async fn get_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<RequestDetail>> {
    let service = RequestService::new(state.db);
    Ok(Json(service.get(&user, request_id).await?))
}

/// Body of a workflow action. An empty body means "no notes, no overrides";
/// anything else has to decode as a `TransitionInput`.
pub struct TransitionBody(pub TransitionInput);

#[axum::async_trait]
impl<S> FromRequest<S> for TransitionBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: HttpRequest, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation("body", rejection.body_text()))?;
        decode_transition_body(&body).map(TransitionBody)
    }
}

pub(crate) fn decode_transition_body(body: &[u8]) -> AppResult<TransitionInput> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TransitionInput::default());
    }
    let Json(input) = Json::<TransitionInput>::from_bytes(body)
        .map_err(|rejection| AppError::validation("body", rejection.body_text()))?;
    Ok(input)
}

async fn apply(
    state: AppState,
    user: AuthUser,
    request_id: Uuid,
    action: RequestAction,
    input: TransitionInput,
) -> AppResult<Json<ActionResponse<Request>>> {
    let service = RequestService::new(state.db);
    let request = service.transition(&user, request_id, action, input).await?;
    Ok(Json(ActionResponse::ok(action.success_message(), request)))
}

pub async fn approve_request_unit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Request>>> {
    apply(state, user, request_id, RequestAction::ApproveUnit, input).await
}

/// Faculty approval; `approved_items` may lower per-item quantities
pub async fn approve_request_faculty(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Request>>> {
    apply(state, user, request_id, RequestAction::ApproveFaculty, input).await
}

pub async fn process_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Request>>> {
    apply(state, user, request_id, RequestAction::StartProcessing, input).await
}

pub async fn mark_request_ready(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Request>>> {
    apply(state, user, request_id, RequestAction::MarkReady, input).await
}

/// Hand out the goods; deducts warehouse stock
pub async fn complete_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Request>>> {
    apply(state, user, request_id, RequestAction::Complete, input).await
}

pub async fn reject_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Request>>> {
    apply(state, user, request_id, RequestAction::Reject, input).await
}

pub async fn cancel_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
    TransitionBody(input): TransitionBody,
) -> AppResult<Json<ActionResponse<Request>>> {
    apply(state, user, request_id, RequestAction::Cancel, input).await
}
