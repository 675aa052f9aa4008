//! Asset distribution service
//!
//! Drafts allocate one asset model across rooms, execution materializes one
//! IN_TRANSIT asset per allocated unit, and rooms confirm receipt in one or
//! more handshakes until the distribution completes.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::config::AssetConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{DistributionRow, TargetRow, DISTRIBUTION_COLUMNS, TARGET_COLUMNS};
use crate::services::asset::{AssetService, NewAssetBatch};
use crate::services::audit::AuditService;
use crate::services::document_code::{next_document_code, DocumentKind};
use crate::services::notification::{NotificationMessage, NotificationService};
use shared::{
    all_targets_received, plan_execution, validate_allocation, validate_receipt, AssetLocation,
    AuditEntity, Distribution, DistributionDetail, DistributionStatus, DistributionTarget,
    MovementStatus, NotificationType, PaginatedResponse, Pagination, ReceiptError,
    TargetAllocation,
};

#[derive(Clone)]
pub struct DistributionService {
    db: PgPool,
}

/// Body of draft creation and draft edit
#[derive(Debug, Deserialize, Validate)]
pub struct DraftInput {
    pub model_id: Uuid,
    pub total_quantity: i32,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
    pub targets: Vec<TargetAllocation>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub received_qty: i32,
    pub room_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct DistributionQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ExecutionResult {
    pub distribution: Distribution,
    pub assets_created: u64,
}

#[derive(Debug, Serialize)]
pub struct ReceiptResult {
    pub target: DistributionTarget,
    pub assets_received: usize,
    pub distribution_status: DistributionStatus,
}

/// A shipped target still waiting for its room to confirm
#[derive(Debug, Serialize, FromRow)]
pub struct PendingTarget {
    pub target_id: Uuid,
    pub distribution_id: Uuid,
    pub distribution_code: String,
    pub model_id: Uuid,
    pub model_name: String,
    pub room_id: Uuid,
    pub allocated_quantity: i32,
    pub received_quantity: i32,
    pub pending_quantity: i32,
}

/// Target joined with what the handshake needs to authorize and validate it
#[derive(Debug, FromRow)]
struct ReceiptContextRow {
    distribution_id: Uuid,
    distribution_code: String,
    distribution_status: String,
    model_id: Uuid,
    created_by: Uuid,
    room_id: Uuid,
    unit_id: Uuid,
    faculty_id: Uuid,
    allocated_quantity: i32,
    received_quantity: i32,
}

impl DistributionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a DRAFT distribution with one target per non-zero allocation
    pub async fn create_draft(&self, user: &AuthUser, input: DraftInput) -> AppResult<DistributionDetail> {
        let allocations = validate_allocation(input.total_quantity, &input.targets)?;

        let mut tx = self.db.begin().await?;

        ensure_model_exists(&mut tx, input.model_id).await?;
        ensure_rooms_exist(&mut tx, &allocations).await?;

        let code = next_document_code(&mut tx, DocumentKind::Distribution).await?;

        let row = sqlx::query_as::<_, DistributionRow>(&format!(
            r#"
            INSERT INTO asset_distributions (code, model_id, total_quantity, status, notes, created_by)
            VALUES ($1, $2, $3, 'DRAFT', $4, $5)
            RETURNING {}
            "#,
            DISTRIBUTION_COLUMNS
        ))
        .bind(&code)
        .bind(input.model_id)
        .bind(input.total_quantity)
        .bind(&input.notes)
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let targets = insert_targets(&mut tx, row.id, &allocations).await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            "distribution.created",
            AuditEntity::Distribution,
            row.id,
            json!({
                "code": code,
                "total_quantity": input.total_quantity,
                "targets": allocations.len(),
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            distribution_id = %row.id,
            code = %code,
            total_quantity = input.total_quantity,
            "Distribution draft created"
        );

        Ok(DistributionDetail {
            distribution: row.try_into()?,
            targets,
        })
    }

    /// Replace a draft's header and targets, re-validating the allocation
    pub async fn update_draft(
        &self,
        user: &AuthUser,
        distribution_id: Uuid,
        input: DraftInput,
    ) -> AppResult<DistributionDetail> {
        let allocations = validate_allocation(input.total_quantity, &input.targets)?;

        let mut tx = self.db.begin().await?;

        lock_draft(&mut tx, distribution_id, "edited").await?;
        ensure_model_exists(&mut tx, input.model_id).await?;
        ensure_rooms_exist(&mut tx, &allocations).await?;

        let row = sqlx::query_as::<_, DistributionRow>(&format!(
            r#"
            UPDATE asset_distributions
            SET model_id = $2, total_quantity = $3, notes = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'DRAFT'
            RETURNING {}
            "#,
            DISTRIBUTION_COLUMNS
        ))
        .bind(distribution_id)
        .bind(input.model_id)
        .bind(input.total_quantity)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM asset_distribution_targets WHERE distribution_id = $1")
            .bind(distribution_id)
            .execute(&mut *tx)
            .await?;

        let targets = insert_targets(&mut tx, distribution_id, &allocations).await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            "distribution.updated",
            AuditEntity::Distribution,
            distribution_id,
            json!({
                "total_quantity": input.total_quantity,
                "targets": allocations.len(),
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(%distribution_id, "Distribution draft updated");

        Ok(DistributionDetail {
            distribution: row.try_into()?,
            targets,
        })
    }

    /// Delete a draft and its targets
    pub async fn delete_draft(&self, user: &AuthUser, distribution_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let draft = lock_draft(&mut tx, distribution_id, "deleted").await?;

        sqlx::query("DELETE FROM asset_distributions WHERE id = $1 AND status = 'DRAFT'")
            .bind(distribution_id)
            .execute(&mut *tx)
            .await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            "distribution.deleted",
            AuditEntity::Distribution,
            distribution_id,
            json!({ "code": draft.code }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(%distribution_id, "Distribution draft deleted");
        Ok(())
    }

    /// Ship a draft: materialize every allocated unit and flip DRAFT -> SHIPPED.
    ///
    /// Everything happens in one transaction; on any failure the distribution
    /// stays DRAFT and no asset rows remain.
    pub async fn execute(
        &self,
        user: &AuthUser,
        distribution_id: Uuid,
        asset_config: &AssetConfig,
    ) -> AppResult<ExecutionResult> {
        let mut tx = self.db.begin().await?;

        let draft = lock_draft(&mut tx, distribution_id, "executed").await?;
        let targets = fetch_targets(&mut tx, distribution_id).await?;

        let plan = plan_execution(&targets);
        if plan.len() as i64 != i64::from(draft.total_quantity) {
            return Err(AppError::Consistency(format!(
                "Distribution {} allocates {} units but its total is {}",
                draft.code,
                plan.len(),
                draft.total_quantity
            )));
        }

        let model_code = sqlx::query_scalar::<_, String>("SELECT code FROM asset_models WHERE id = $1")
            .bind(draft.model_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Asset model".to_string()))?;

        let assets_created = AssetService::materialize(
            &mut tx,
            asset_config,
            NewAssetBatch {
                model_id: draft.model_id,
                model_code: &model_code,
                locations: plan.into_iter().map(AssetLocation::Room).collect(),
                movement_status: MovementStatus::InTransit,
                distribution_id: Some(distribution_id),
            },
        )
        .await?;

        let shipped = sqlx::query_as::<_, DistributionRow>(&format!(
            r#"
            UPDATE asset_distributions
            SET status = 'SHIPPED', executed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'DRAFT'
            RETURNING {}
            "#,
            DISTRIBUTION_COLUMNS
        ))
        .bind(distribution_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(format!(
                "Distribution {} is no longer a draft",
                draft.code
            ))
        })?;

        let room_ids: Vec<Uuid> = targets.iter().map(|t| t.room_id).collect();
        NotificationService::notify_room_units(
            &mut tx,
            &room_ids,
            &NotificationMessage {
                notification_type: NotificationType::DistributionShipped,
                title: "Assets on the way".to_string(),
                message: format!(
                    "Distribution {} has shipped. Confirm receipt once the units arrive.",
                    draft.code
                ),
                entity: AuditEntity::Distribution,
                entity_id: distribution_id,
            },
        )
        .await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            "distribution.executed",
            AuditEntity::Distribution,
            distribution_id,
            json!({ "assets_created": assets_created }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            %distribution_id,
            code = %draft.code,
            assets_created,
            "Distribution executed"
        );

        Ok(ExecutionResult {
            distribution: shipped.try_into()?,
            assets_created,
        })
    }

    /// Confirm receipt of `received_qty` units of one target in its room.
    ///
    /// The distribution row is locked for the whole handshake so concurrent
    /// receipts on sibling targets serialize and the completion check sees
    /// every committed receipt.
    pub async fn receive(
        &self,
        user: &AuthUser,
        target_id: Uuid,
        input: ReceiveInput,
    ) -> AppResult<ReceiptResult> {
        if input.received_qty <= 0 {
            return Err(ReceiptError::NonPositiveQuantity(input.received_qty).into());
        }

        let mut tx = self.db.begin().await?;

        let ctx = sqlx::query_as::<_, ReceiptContextRow>(
            r#"
            SELECT d.id AS distribution_id, d.code AS distribution_code,
                   d.status AS distribution_status, d.model_id, d.created_by,
                   t.room_id, r.unit_id, u.faculty_id,
                   t.allocated_quantity, t.received_quantity
            FROM asset_distribution_targets t
            JOIN asset_distributions d ON d.id = t.distribution_id
            JOIN rooms r ON r.id = t.room_id
            JOIN units u ON u.id = r.unit_id
            WHERE t.id = $1
            FOR UPDATE OF d
            "#,
        )
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Distribution target".to_string()))?;

        if ctx.room_id != input.room_id {
            return Err(AppError::validation(
                "room_id",
                "Room does not match this distribution target",
            ));
        }

        if !user.covers_room(ctx.unit_id, ctx.faculty_id) {
            return Err(AppError::Forbidden(
                "Only members of the receiving room's unit can confirm receipt".to_string(),
            ));
        }

        if DistributionStatus::from_str(&ctx.distribution_status) != Some(DistributionStatus::Shipped) {
            return Err(AppError::InvalidStateTransition(format!(
                "Distribution {} is {}; only shipped distributions can be received",
                ctx.distribution_code, ctx.distribution_status
            )));
        }

        validate_receipt(ctx.allocated_quantity, ctx.received_quantity, input.received_qty)?;

        let updated = sqlx::query_as::<_, TargetRow>(&format!(
            r#"
            UPDATE asset_distribution_targets
            SET received_quantity = received_quantity + $2,
                receiver_id = $3,
                received_at = NOW()
            WHERE id = $1 AND received_quantity + $2 <= allocated_quantity
            RETURNING {}
            "#,
            TARGET_COLUMNS
        ))
        .bind(target_id)
        .bind(input.received_qty)
        .bind(user.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ReceiptError::ExceedsPending {
            requested: input.received_qty,
            pending: ctx.allocated_quantity - ctx.received_quantity,
        })?;

        let asset_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM fixed_assets
            WHERE room_id = $1 AND model_id = $2 AND distribution_id = $3
              AND movement_status = 'IN_TRANSIT'
            ORDER BY created_at, id
            LIMIT $4
            FOR UPDATE
            "#,
        )
        .bind(ctx.room_id)
        .bind(ctx.model_id)
        .bind(ctx.distribution_id)
        .bind(i64::from(input.received_qty))
        .fetch_all(&mut *tx)
        .await?;

        if asset_ids.len() < input.received_qty as usize {
            tracing::error!(
                %target_id,
                requested = input.received_qty,
                in_transit = asset_ids.len(),
                "Not enough in-transit assets for receipt"
            );
            return Err(AppError::Consistency(format!(
                "Only {} in-transit assets found for {} received units",
                asset_ids.len(),
                input.received_qty
            )));
        }

        sqlx::query(
            "UPDATE fixed_assets SET movement_status = 'IN_STORE', updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(&asset_ids)
        .execute(&mut *tx)
        .await?;

        let siblings = fetch_targets(&mut tx, ctx.distribution_id).await?;
        let mut distribution_status = DistributionStatus::Shipped;
        if all_targets_received(&siblings) {
            sqlx::query(
                r#"
                UPDATE asset_distributions
                SET status = 'COMPLETED', updated_at = NOW()
                WHERE id = $1 AND status = 'SHIPPED'
                "#,
            )
            .bind(ctx.distribution_id)
            .execute(&mut *tx)
            .await?;
            distribution_status = DistributionStatus::Completed;
        }

        NotificationService::notify_user(
            &mut tx,
            ctx.created_by,
            &NotificationMessage {
                notification_type: NotificationType::DistributionReceived,
                title: "Distribution received".to_string(),
                message: format!(
                    "{} unit(s) of distribution {} were received ({}/{} for the room).",
                    input.received_qty,
                    ctx.distribution_code,
                    updated.received_quantity,
                    updated.allocated_quantity
                ),
                entity: AuditEntity::Distribution,
                entity_id: ctx.distribution_id,
            },
        )
        .await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            "distribution_target.received",
            AuditEntity::DistributionTarget,
            target_id,
            json!({
                "distribution_id": ctx.distribution_id,
                "received_qty": input.received_qty,
                "received_quantity": updated.received_quantity,
                "allocated_quantity": updated.allocated_quantity,
            }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            %target_id,
            distribution_id = %ctx.distribution_id,
            received = input.received_qty,
            completed = distribution_status == DistributionStatus::Completed,
            "Distribution receipt confirmed"
        );

        Ok(ReceiptResult {
            target: updated.into(),
            assets_received: asset_ids.len(),
            distribution_status,
        })
    }

    pub async fn get(&self, distribution_id: Uuid) -> AppResult<DistributionDetail> {
        let row = sqlx::query_as::<_, DistributionRow>(&format!(
            "SELECT {} FROM asset_distributions WHERE id = $1",
            DISTRIBUTION_COLUMNS
        ))
        .bind(distribution_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Distribution".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let targets = fetch_targets(&mut conn, distribution_id).await?;

        Ok(DistributionDetail {
            distribution: row.try_into()?,
            targets,
        })
    }

    pub async fn list(&self, query: DistributionQuery) -> AppResult<PaginatedResponse<Distribution>> {
        let status = match query.status.as_deref() {
            Some(s) => Some(
                DistributionStatus::from_str(s)
                    .ok_or_else(|| AppError::validation("status", "Unknown distribution status"))?,
            ),
            None => None,
        };
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let pagination = Pagination::from_query(query.page, query.per_page);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM asset_distributions
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR code ILIKE $2 OR notes ILIKE $2)
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, DistributionRow>(&format!(
            r#"
            SELECT {} FROM asset_distributions
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR code ILIKE $2 OR notes ILIKE $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
            DISTRIBUTION_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let distributions = rows
            .into_iter()
            .map(Distribution::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(distributions, &pagination, total.max(0) as u64))
    }

    /// Shipped targets of a room that still have units to confirm
    pub async fn pending_for_room(&self, user: &AuthUser, room_id: Uuid) -> AppResult<Vec<PendingTarget>> {
        let (unit_id, faculty_id) = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT r.unit_id, u.faculty_id FROM rooms r JOIN units u ON u.id = r.unit_id WHERE r.id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Room".to_string()))?;

        if !user.covers_room(unit_id, faculty_id) {
            return Err(AppError::Forbidden("Room is outside your unit".to_string()));
        }

        let pending = sqlx::query_as::<_, PendingTarget>(
            r#"
            SELECT t.id AS target_id, d.id AS distribution_id, d.code AS distribution_code,
                   d.model_id, m.name AS model_name, t.room_id,
                   t.allocated_quantity, t.received_quantity,
                   t.allocated_quantity - t.received_quantity AS pending_quantity
            FROM asset_distribution_targets t
            JOIN asset_distributions d ON d.id = t.distribution_id
            JOIN asset_models m ON m.id = d.model_id
            WHERE t.room_id = $1
              AND d.status = 'SHIPPED'
              AND t.received_quantity < t.allocated_quantity
            ORDER BY d.executed_at, d.code
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.db)
        .await?;

        Ok(pending)
    }
}

/// Lock a distribution row and require it to still be a draft
async fn lock_draft(conn: &mut PgConnection, distribution_id: Uuid, verb: &str) -> AppResult<Distribution> {
    let row = sqlx::query_as::<_, DistributionRow>(&format!(
        "SELECT {} FROM asset_distributions WHERE id = $1 FOR UPDATE",
        DISTRIBUTION_COLUMNS
    ))
    .bind(distribution_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Distribution".to_string()))?;

    let distribution = Distribution::try_from(row)?;
    if distribution.status != DistributionStatus::Draft {
        return Err(AppError::InvalidStateTransition(format!(
            "Distribution {} is {}; only drafts can be {}",
            distribution.code,
            distribution.status.as_str(),
            verb
        )));
    }

    Ok(distribution)
}

async fn fetch_targets(conn: &mut PgConnection, distribution_id: Uuid) -> AppResult<Vec<DistributionTarget>> {
    let rows = sqlx::query_as::<_, TargetRow>(&format!(
        "SELECT {} FROM asset_distribution_targets WHERE distribution_id = $1 ORDER BY allocated_quantity DESC, id",
        TARGET_COLUMNS
    ))
    .bind(distribution_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(DistributionTarget::from).collect())
}

async fn insert_targets(
    conn: &mut PgConnection,
    distribution_id: Uuid,
    allocations: &[TargetAllocation],
) -> AppResult<Vec<DistributionTarget>> {
    let room_ids: Vec<Uuid> = allocations.iter().map(|a| a.room_id).collect();
    let quantities: Vec<i32> = allocations.iter().map(|a| a.allocated_quantity).collect();

    let rows = sqlx::query_as::<_, TargetRow>(&format!(
        r#"
        INSERT INTO asset_distribution_targets (distribution_id, room_id, allocated_quantity)
        SELECT $1, t.room_id, t.allocated_quantity
        FROM UNNEST($2::uuid[], $3::int4[]) AS t(room_id, allocated_quantity)
        RETURNING {}
        "#,
        TARGET_COLUMNS
    ))
    .bind(distribution_id)
    .bind(&room_ids)
    .bind(&quantities)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(DistributionTarget::from).collect())
}

async fn ensure_model_exists(conn: &mut PgConnection, model_id: Uuid) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM asset_models WHERE id = $1)")
        .bind(model_id)
        .fetch_one(conn)
        .await?;

    if !exists {
        return Err(AppError::NotFound("Asset model".to_string()));
    }
    Ok(())
}

async fn ensure_rooms_exist(conn: &mut PgConnection, allocations: &[TargetAllocation]) -> AppResult<()> {
    let room_ids: Vec<Uuid> = allocations.iter().map(|a| a.room_id).collect();
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rooms WHERE id = ANY($1)")
        .bind(&room_ids)
        .fetch_one(conn)
        .await?;

    if found != room_ids.len() as i64 {
        return Err(AppError::NotFound("Room".to_string()));
    }
    Ok(())
}
