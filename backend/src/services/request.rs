//! Consumable request service
//!
//! Requests climb unit approval, faculty approval and warehouse fulfilment.
//! Every status change goes through `shared::next_request_status` and leaves
//! exactly one timeline row behind.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{RequestItemRow, RequestRow, TimelineRow, REQUEST_COLUMNS};
use crate::services::audit::AuditService;
use crate::services::document_code::{next_document_code, DocumentKind};
use crate::services::notification::{NotificationMessage, NotificationService};
use shared::{
    next_request_status, validate_approved_quantity, validate_line_quantities, validate_notes,
    validate_rejection_reason, AuditEntity, NotificationType, PaginatedResponse, Pagination,
    Request, RequestAction, RequestDetail, RequestItem, RequestStatus, UserRole, WorkflowAction,
};

#[derive(Clone)]
pub struct RequestService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestInput {
    pub room_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    pub items: Vec<RequestItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct RequestItemInput {
    pub consumable_id: Uuid,
    pub quantity: i32,
}

/// Body shared by every transition endpoint
#[derive(Debug, Default, Deserialize)]
pub struct TransitionInput {
    pub notes: Option<String>,
    pub reason: Option<String>,
    pub approved_items: Option<Vec<ApprovedItemInput>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ApprovedItemInput {
    pub item_id: Uuid,
    pub quantity_approved: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Request row plus the organization it belongs to
#[derive(Debug, FromRow)]
struct ScopedRequestRow {
    #[sqlx(flatten)]
    request: RequestRow,
    unit_id: Uuid,
    faculty_id: Uuid,
}

/// Approved quantities for `items`, defaulting to the requested quantity
pub fn resolve_approved_quantities(
    items: &[RequestItem],
    approved: &[ApprovedItemInput],
) -> AppResult<Vec<(Uuid, i32)>> {
    let mut overrides: HashMap<Uuid, i32> = HashMap::with_capacity(approved.len());
    for entry in approved {
        if overrides.insert(entry.item_id, entry.quantity_approved).is_some() {
            return Err(AppError::validation(
                "approved_items",
                "Each item may appear only once",
            ));
        }
    }

    let mut resolved = Vec::with_capacity(items.len());
    for item in items {
        let quantity = overrides
            .remove(&item.id)
            .unwrap_or(item.quantity_requested);
        validate_approved_quantity(item.quantity_requested, quantity)
            .map_err(|msg| AppError::validation("approved_items", msg))?;
        resolved.push((item.id, quantity));
    }

    if !overrides.is_empty() {
        return Err(AppError::validation(
            "approved_items",
            "Approved items must belong to this request",
        ));
    }

    Ok(resolved)
}

impl RequestService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Submit a request; it starts at PENDING_UNIT
    pub async fn create(&self, user: &AuthUser, input: CreateRequestInput) -> AppResult<RequestDetail> {
        let lines: Vec<(Uuid, i32)> = input
            .items
            .iter()
            .map(|i| (i.consumable_id, i.quantity))
            .collect();
        validate_line_quantities(&lines).map_err(|msg| AppError::validation("items", msg))?;

        let mut tx = self.db.begin().await?;

        let (unit_id, faculty_id) = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT r.unit_id, u.faculty_id FROM rooms r JOIN units u ON u.id = r.unit_id WHERE r.id = $1",
        )
        .bind(input.room_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Room".to_string()))?;

        if !user.covers_room(unit_id, faculty_id) {
            return Err(AppError::Forbidden(
                "Requests can only be raised for rooms of your own unit".to_string(),
            ));
        }

        let warehouse_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)")
                .bind(input.warehouse_id)
                .fetch_one(&mut *tx)
                .await?;
        if !warehouse_exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        let consumable_ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
        let quantities: Vec<i32> = lines.iter().map(|(_, q)| *q).collect();

        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM consumables WHERE id = ANY($1)")
            .bind(&consumable_ids)
            .fetch_one(&mut *tx)
            .await?;
        if found != consumable_ids.len() as i64 {
            return Err(AppError::NotFound("Consumable".to_string()));
        }

        let code = next_document_code(&mut tx, DocumentKind::Request).await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            INSERT INTO requests (code, requester_id, room_id, warehouse_id, status, description)
            VALUES ($1, $2, $3, $4, 'PENDING_UNIT', $5)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(&code)
        .bind(user.user_id)
        .bind(input.room_id)
        .bind(input.warehouse_id)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO request_items (request_id, consumable_id, quantity_requested)
            SELECT $1, t.consumable_id, t.quantity
            FROM UNNEST($2::uuid[], $3::int4[]) AS t(consumable_id, quantity)
            "#,
        )
        .bind(row.id)
        .bind(&consumable_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        append_timeline(
            &mut tx,
            row.id,
            RequestStatus::PendingUnit,
            Some("Request submitted"),
            user.user_id,
        )
        .await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            "request.created",
            AuditEntity::Request,
            row.id,
            json!({ "code": code, "items": lines.len() }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(request_id = %row.id, code = %code, "Request submitted");

        self.get(user, row.id).await
    }

    /// Apply one workflow action.
    ///
    /// The row is locked, the transition table decides the next status and
    /// the update is conditional on the status that was read.
    pub async fn transition(
        &self,
        user: &AuthUser,
        request_id: Uuid,
        action: RequestAction,
        input: TransitionInput,
    ) -> AppResult<Request> {
        validate_notes(input.notes.as_deref()).map_err(|msg| AppError::validation("notes", msg))?;
        if action == RequestAction::Reject {
            validate_rejection_reason(input.reason.as_deref())
                .map_err(|msg| AppError::validation("reason", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let scoped = sqlx::query_as::<_, ScopedRequestRow>(
            r#"
            SELECT rq.id, rq.code, rq.requester_id, rq.room_id, rq.warehouse_id, rq.status,
                   rq.description, rq.rejection_reason, rq.created_at, rq.updated_at,
                   r.unit_id, u.faculty_id
            FROM requests rq
            JOIN rooms r ON r.id = rq.room_id
            JOIN units u ON u.id = r.unit_id
            WHERE rq.id = $1
            FOR UPDATE OF rq
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Request".to_string()))?;

        let (unit_id, faculty_id) = (scoped.unit_id, scoped.faculty_id);
        let current = Request::try_from(scoped.request)?;

        if !user.covers_request(unit_id, faculty_id, current.warehouse_id) {
            return Err(AppError::Forbidden("Request is outside your scope".to_string()));
        }
        if action == RequestAction::Cancel
            && user.role == UserRole::UnitStaff
            && current.requester_id != user.user_id
        {
            return Err(AppError::Forbidden(
                "Unit staff can only cancel their own requests".to_string(),
            ));
        }

        let next = next_request_status(current.status, action, user.role)?;

        match action {
            RequestAction::ApproveFaculty => {
                let items = fetch_items(&mut tx, request_id).await?;
                let approved = resolve_approved_quantities(
                    &items,
                    input.approved_items.as_deref().unwrap_or(&[]),
                )?;
                store_approved_quantities(&mut tx, request_id, &approved).await?;
            }
            RequestAction::Complete => {
                let items = fetch_items(&mut tx, request_id).await?;
                issue_stock(&mut tx, current.warehouse_id, &items).await?;
            }
            _ => {}
        }

        let rejection_reason = match action {
            RequestAction::Reject => input.reason.as_deref().map(str::trim),
            _ => None,
        };

        let updated = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            UPDATE requests
            SET status = $2, rejection_reason = COALESCE($4, rejection_reason), updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(next.as_str())
        .bind(current.status.as_str())
        .bind(rejection_reason)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(format!(
                "Request {} changed status concurrently",
                current.code
            ))
        })?;

        let timeline_notes = rejection_reason.or(input.notes.as_deref());
        append_timeline(&mut tx, request_id, next, timeline_notes, user.user_id).await?;

        if current.requester_id != user.user_id {
            NotificationService::notify_user(
                &mut tx,
                current.requester_id,
                &NotificationMessage {
                    notification_type: NotificationType::RequestStatusChanged,
                    title: format!("Request {}", current.code),
                    message: match rejection_reason {
                        Some(reason) => format!("{}: {}", action.success_message(), reason),
                        None => action.success_message().to_string(),
                    },
                    entity: AuditEntity::Request,
                    entity_id: request_id,
                },
            )
            .await?;
        }

        AuditService::record(
            &mut tx,
            user.user_id,
            &format!("request.{}", action.as_str()),
            AuditEntity::Request,
            request_id,
            json!({ "from": current.status.as_str(), "to": next.as_str() }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            %request_id,
            action = action.as_str(),
            from = current.status.as_str(),
            to = next.as_str(),
            "Request status updated"
        );

        updated.try_into()
    }

    pub async fn get(&self, user: &AuthUser, request_id: Uuid) -> AppResult<RequestDetail> {
        let scoped = sqlx::query_as::<_, ScopedRequestRow>(
            r#"
            SELECT rq.id, rq.code, rq.requester_id, rq.room_id, rq.warehouse_id, rq.status,
                   rq.description, rq.rejection_reason, rq.created_at, rq.updated_at,
                   r.unit_id, u.faculty_id
            FROM requests rq
            JOIN rooms r ON r.id = rq.room_id
            JOIN units u ON u.id = r.unit_id
            WHERE rq.id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Request".to_string()))?;

        if !user.covers_request(scoped.unit_id, scoped.faculty_id, scoped.request.warehouse_id) {
            return Err(AppError::NotFound("Request".to_string()));
        }

        let mut conn = self.db.acquire().await?;
        let items = fetch_items(&mut conn, request_id).await?;

        let timeline = sqlx::query_as::<_, TimelineRow>(
            r#"
            SELECT id, status, notes, actor_id, created_at
            FROM request_timelines
            WHERE request_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(request_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|row| row.into_entry(RequestStatus::from_str))
        .collect::<AppResult<Vec<_>>>()?;

        Ok(RequestDetail {
            request: scoped.request.try_into()?,
            items,
            timeline,
        })
    }

    /// Requests visible to the caller, newest first
    pub async fn list(&self, user: &AuthUser, query: RequestQuery) -> AppResult<PaginatedResponse<Request>> {
        let status = match query.status.as_deref() {
            Some(s) => Some(
                RequestStatus::from_str(s)
                    .ok_or_else(|| AppError::validation("status", "Unknown request status"))?,
            ),
            None => None,
        };
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let scope = user.list_scope();
        let pagination = Pagination::from_query(query.page, query.per_page);

        let filter = r#"
            FROM requests rq
            JOIN rooms r ON r.id = rq.room_id
            JOIN units u ON u.id = r.unit_id
            WHERE ($1::text IS NULL OR rq.status = $1)
              AND ($2::text IS NULL OR rq.code ILIKE $2 OR rq.description ILIKE $2)
              AND ($3::uuid IS NULL OR r.unit_id = $3)
              AND ($4::uuid IS NULL OR u.faculty_id = $4)
              AND ($5::uuid IS NULL OR rq.warehouse_id = $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", filter))
            .bind(status.map(|s| s.as_str()))
            .bind(&search)
            .bind(scope.unit_id)
            .bind(scope.faculty_id)
            .bind(scope.warehouse_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            SELECT rq.id, rq.code, rq.requester_id, rq.room_id, rq.warehouse_id, rq.status,
                   rq.description, rq.rejection_reason, rq.created_at, rq.updated_at
            {}
            ORDER BY rq.created_at DESC, rq.id
            LIMIT $6 OFFSET $7
            "#,
            filter
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(&search)
        .bind(scope.unit_id)
        .bind(scope.faculty_id)
        .bind(scope.warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let requests = rows
            .into_iter()
            .map(Request::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(requests, &pagination, total.max(0) as u64))
    }
}

async fn fetch_items(conn: &mut PgConnection, request_id: Uuid) -> AppResult<Vec<RequestItem>> {
    let rows = sqlx::query_as::<_, RequestItemRow>(
        r#"
        SELECT id, request_id, consumable_id, quantity_requested, quantity_approved
        FROM request_items
        WHERE request_id = $1
        ORDER BY id
        "#,
    )
    .bind(request_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(RequestItem::from).collect())
}

async fn store_approved_quantities(
    conn: &mut PgConnection,
    request_id: Uuid,
    approved: &[(Uuid, i32)],
) -> AppResult<()> {
    let ids: Vec<Uuid> = approved.iter().map(|(id, _)| *id).collect();
    let quantities: Vec<i32> = approved.iter().map(|(_, q)| *q).collect();

    sqlx::query(
        r#"
        UPDATE request_items ri
        SET quantity_approved = t.quantity
        FROM UNNEST($2::uuid[], $3::int4[]) AS t(id, quantity)
        WHERE ri.id = t.id AND ri.request_id = $1
        "#,
    )
    .bind(request_id)
    .bind(&ids)
    .bind(&quantities)
    .execute(conn)
    .await?;

    Ok(())
}

/// Deduct every item's issued quantity from the warehouse stock
async fn issue_stock(conn: &mut PgConnection, warehouse_id: Uuid, items: &[RequestItem]) -> AppResult<()> {
    for item in items.iter().filter(|i| i.quantity_to_issue() > 0) {
        let result = sqlx::query(
            r#"
            UPDATE consumable_stocks
            SET quantity = quantity - $3, updated_at = NOW()
            WHERE consumable_id = $1 AND warehouse_id = $2 AND quantity >= $3
            "#,
        )
        .bind(item.consumable_id)
        .bind(warehouse_id)
        .bind(item.quantity_to_issue())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::InsufficientStock(format!(
                "Warehouse stock cannot cover {} unit(s) of consumable {}",
                item.quantity_to_issue(),
                item.consumable_id
            )));
        }
    }
    Ok(())
}

async fn append_timeline(
    conn: &mut PgConnection,
    request_id: Uuid,
    status: RequestStatus,
    notes: Option<&str>,
    actor_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO request_timelines (request_id, status, notes, actor_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(request_id)
    .bind(status.as_str())
    .bind(notes)
    .bind(actor_id)
    .execute(conn)
    .await?;
    Ok(())
}
