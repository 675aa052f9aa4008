//! HTTP handler for the audit log viewer

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::audit::{AuditLogQuery, AuditService};
use crate::AppState;
use shared::{AuditLogEntry, PaginatedResponse, AUDIT_READERS};

pub async fn list_audit_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<PaginatedResponse<AuditLogEntry>>> {
    user.require_role(AUDIT_READERS)?;

    let service = AuditService::new(state.db);
    Ok(Json(service.list(query).await?))
}
