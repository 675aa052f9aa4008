//! Procurement service
//!
//! Warehouses open procurements for consumables and asset models; faculty
//! approval precedes completion, which restocks consumables and registers the
//! purchased assets in the warehouse.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::config::AssetConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{ProcurementItemRow, ProcurementRow, TimelineRow, PROCUREMENT_COLUMNS};
use crate::services::asset::{AssetService, NewAssetBatch};
use crate::services::audit::AuditService;
use crate::services::document_code::{next_document_code, DocumentKind};
use crate::services::notification::{NotificationMessage, NotificationService};
use crate::services::request::TransitionInput;
use shared::{
    estimated_total, next_procurement_status, validate_notes, validate_rejection_reason,
    AssetLocation, AuditEntity, MovementStatus, NotificationType, PaginatedResponse, Pagination,
    Procurement, ProcurementAction, ProcurementDetail, ProcurementItem, ProcurementLine,
    ProcurementStatus, WorkflowAction,
};

#[derive(Clone)]
pub struct ProcurementService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProcurementInput {
    pub warehouse_id: Uuid,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    pub items: Vec<ProcurementItemInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcurementItemInput {
    pub consumable_id: Option<Uuid>,
    pub asset_model_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcurementQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, FromRow)]
struct ScopedProcurementRow {
    #[sqlx(flatten)]
    procurement: ProcurementRow,
    warehouse_faculty_id: Option<Uuid>,
}

/// Check item lines: at least one, each naming exactly one catalog entry with a
/// positive quantity and a non-negative price, no entry twice
pub fn validate_procurement_items(items: &[ProcurementItemInput]) -> AppResult<Vec<ProcurementLine>> {
    if items.is_empty() {
        return Err(AppError::validation("items", "At least one item is required"));
    }

    let mut seen = HashSet::with_capacity(items.len());
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let line = ProcurementLine::from_columns(item.consumable_id, item.asset_model_id)
            .ok_or_else(|| {
                AppError::validation(
                    "items",
                    "Each item must reference exactly one of consumable_id or asset_model_id",
                )
            })?;
        if item.quantity <= 0 {
            return Err(AppError::validation(
                "items",
                "Item quantities must be greater than zero",
            ));
        }
        if item.unit_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(AppError::validation("items", "Unit price cannot be negative"));
        }
        if !seen.insert(line) {
            return Err(AppError::validation("items", "Each item may appear only once"));
        }
        lines.push(line);
    }
    Ok(lines)
}

impl ProcurementService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a procurement at PENDING
    pub async fn create(
        &self,
        user: &AuthUser,
        input: CreateProcurementInput,
    ) -> AppResult<ProcurementDetail> {
        let lines = validate_procurement_items(&input.items)?;

        let mut tx = self.db.begin().await?;

        let warehouse_faculty = sqlx::query_as::<_, (Option<Uuid>,)>(
            "SELECT faculty_id FROM warehouses WHERE id = $1",
        )
        .bind(input.warehouse_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?
        .0;

        if !user.covers_warehouse(input.warehouse_id, warehouse_faculty) {
            return Err(AppError::Forbidden(
                "Procurements can only be opened for your own warehouse".to_string(),
            ));
        }

        let consumable_ids: Vec<Option<Uuid>> = input.items.iter().map(|i| i.consumable_id).collect();
        let model_ids: Vec<Option<Uuid>> = input.items.iter().map(|i| i.asset_model_id).collect();
        let quantities: Vec<i32> = input.items.iter().map(|i| i.quantity).collect();
        let prices: Vec<Option<Decimal>> = input.items.iter().map(|i| i.unit_price).collect();

        let code = next_document_code(&mut tx, DocumentKind::Procurement).await?;

        let row = sqlx::query_as::<_, ProcurementRow>(&format!(
            r#"
            INSERT INTO procurements (code, requester_id, warehouse_id, status, description)
            VALUES ($1, $2, $3, 'PENDING', $4)
            RETURNING {}
            "#,
            PROCUREMENT_COLUMNS
        ))
        .bind(&code)
        .bind(user.user_id)
        .bind(input.warehouse_id)
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO procurement_items (procurement_id, consumable_id, asset_model_id, quantity, unit_price)
            SELECT $1, t.consumable_id, t.asset_model_id, t.quantity, t.unit_price
            FROM UNNEST($2::uuid[], $3::uuid[], $4::int4[], $5::numeric[])
                AS t(consumable_id, asset_model_id, quantity, unit_price)
            "#,
        )
        .bind(row.id)
        .bind(&consumable_ids)
        .bind(&model_ids)
        .bind(&quantities)
        .bind(&prices)
        .execute(&mut *tx)
        .await?;

        append_timeline(
            &mut tx,
            row.id,
            ProcurementStatus::Pending,
            Some("Procurement opened"),
            user.user_id,
        )
        .await?;

        AuditService::record(
            &mut tx,
            user.user_id,
            "procurement.created",
            AuditEntity::Procurement,
            row.id,
            json!({ "code": code, "items": lines.len() }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(procurement_id = %row.id, code = %code, "Procurement opened");

        self.get(user, row.id).await
    }

    /// Apply one workflow action; completion receives the goods into stock
    pub async fn transition(
        &self,
        user: &AuthUser,
        procurement_id: Uuid,
        action: ProcurementAction,
        input: TransitionInput,
        asset_config: &AssetConfig,
    ) -> AppResult<Procurement> {
        validate_notes(input.notes.as_deref()).map_err(|msg| AppError::validation("notes", msg))?;
        if action == ProcurementAction::Reject {
            validate_rejection_reason(input.reason.as_deref())
                .map_err(|msg| AppError::validation("reason", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let scoped = sqlx::query_as::<_, ScopedProcurementRow>(
            r#"
            SELECT p.id, p.code, p.requester_id, p.warehouse_id, p.status, p.description,
                   p.rejection_reason, p.created_at, p.updated_at,
                   w.faculty_id AS warehouse_faculty_id
            FROM procurements p
            JOIN warehouses w ON w.id = p.warehouse_id
            WHERE p.id = $1
            FOR UPDATE OF p
            "#,
        )
        .bind(procurement_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Procurement".to_string()))?;

        let warehouse_faculty = scoped.warehouse_faculty_id;
        let current = Procurement::try_from(scoped.procurement)?;

        if !user.covers_warehouse(current.warehouse_id, warehouse_faculty) {
            return Err(AppError::Forbidden("Procurement is outside your scope".to_string()));
        }

        let next = next_procurement_status(current.status, action, user.role)?;

        if action == ProcurementAction::Complete {
            let items = fetch_items(&mut tx, procurement_id).await?;
            receive_goods(&mut tx, current.warehouse_id, &items, asset_config).await?;
        }

        let rejection_reason = match action {
            ProcurementAction::Reject => input.reason.as_deref().map(str::trim),
            _ => None,
        };

        let updated = sqlx::query_as::<_, ProcurementRow>(&format!(
            r#"
            UPDATE procurements
            SET status = $2, rejection_reason = COALESCE($4, rejection_reason), updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {}
            "#,
            PROCUREMENT_COLUMNS
        ))
        .bind(procurement_id)
        .bind(next.as_str())
        .bind(current.status.as_str())
        .bind(rejection_reason)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(format!(
                "Procurement {} changed status concurrently",
                current.code
            ))
        })?;

        append_timeline(
            &mut tx,
            procurement_id,
            next,
            rejection_reason.or(input.notes.as_deref()),
            user.user_id,
        )
        .await?;

        if current.requester_id != user.user_id {
            NotificationService::notify_user(
                &mut tx,
                current.requester_id,
                &NotificationMessage {
                    notification_type: NotificationType::ProcurementStatusChanged,
                    title: format!("Procurement {}", current.code),
                    message: match rejection_reason {
                        Some(reason) => format!("{}: {}", action.success_message(), reason),
                        None => action.success_message().to_string(),
                    },
                    entity: AuditEntity::Procurement,
                    entity_id: procurement_id,
                },
            )
            .await?;
        }

        AuditService::record(
            &mut tx,
            user.user_id,
            &format!("procurement.{}", action.as_str()),
            AuditEntity::Procurement,
            procurement_id,
            json!({ "from": current.status.as_str(), "to": next.as_str() }),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            %procurement_id,
            action = action.as_str(),
            from = current.status.as_str(),
            to = next.as_str(),
            "Procurement status updated"
        );

        updated.try_into()
    }

    pub async fn get(&self, user: &AuthUser, procurement_id: Uuid) -> AppResult<ProcurementDetail> {
        let scoped = sqlx::query_as::<_, ScopedProcurementRow>(
            r#"
            SELECT p.id, p.code, p.requester_id, p.warehouse_id, p.status, p.description,
                   p.rejection_reason, p.created_at, p.updated_at,
                   w.faculty_id AS warehouse_faculty_id
            FROM procurements p
            JOIN warehouses w ON w.id = p.warehouse_id
            WHERE p.id = $1
            "#,
        )
        .bind(procurement_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Procurement".to_string()))?;

        if !user.covers_warehouse(scoped.procurement.warehouse_id, scoped.warehouse_faculty_id) {
            return Err(AppError::NotFound("Procurement".to_string()));
        }

        let mut conn = self.db.acquire().await?;
        let items = fetch_items(&mut conn, procurement_id).await?;

        let timeline = sqlx::query_as::<_, TimelineRow>(
            r#"
            SELECT id, status, notes, actor_id, created_at
            FROM procurement_timelines
            WHERE procurement_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(procurement_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|row| row.into_entry(ProcurementStatus::from_str))
        .collect::<AppResult<Vec<_>>>()?;

        Ok(ProcurementDetail {
            procurement: scoped.procurement.try_into()?,
            estimated_total: estimated_total(items.iter().map(|i| (i.quantity, i.unit_price))),
            items,
            timeline,
        })
    }

    /// Procurements visible to the caller, newest first
    pub async fn list(
        &self,
        user: &AuthUser,
        query: ProcurementQuery,
    ) -> AppResult<PaginatedResponse<Procurement>> {
        let status = match query.status.as_deref() {
            Some(s) => Some(
                ProcurementStatus::from_str(s)
                    .ok_or_else(|| AppError::validation("status", "Unknown procurement status"))?,
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
            FROM procurements p
            JOIN warehouses w ON w.id = p.warehouse_id
            WHERE ($1::text IS NULL OR p.status = $1)
              AND ($2::text IS NULL OR p.code ILIKE $2 OR p.description ILIKE $2)
              AND ($3::uuid IS NULL OR w.faculty_id = $3)
              AND ($4::uuid IS NULL OR p.warehouse_id = $4)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", filter))
            .bind(status.map(|s| s.as_str()))
            .bind(&search)
            .bind(scope.faculty_id)
            .bind(scope.warehouse_id)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, ProcurementRow>(&format!(
            r#"
            SELECT p.id, p.code, p.requester_id, p.warehouse_id, p.status, p.description,
                   p.rejection_reason, p.created_at, p.updated_at
            {}
            ORDER BY p.created_at DESC, p.id
            LIMIT $5 OFFSET $6
            "#,
            filter
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(&search)
        .bind(scope.faculty_id)
        .bind(scope.warehouse_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let procurements = rows
            .into_iter()
            .map(Procurement::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(procurements, &pagination, total.max(0) as u64))
    }
}

async fn fetch_items(conn: &mut PgConnection, procurement_id: Uuid) -> AppResult<Vec<ProcurementItem>> {
    sqlx::query_as::<_, ProcurementItemRow>(
        r#"
        SELECT id, procurement_id, consumable_id, asset_model_id, quantity, unit_price
        FROM procurement_items
        WHERE procurement_id = $1
        ORDER BY id
        "#,
    )
    .bind(procurement_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .map(ProcurementItem::try_from)
    .collect()
}

/// Restock consumables and register purchased assets in the warehouse
async fn receive_goods(
    conn: &mut PgConnection,
    warehouse_id: Uuid,
    items: &[ProcurementItem],
    asset_config: &AssetConfig,
) -> AppResult<()> {
    for item in items {
        match item.line {
            ProcurementLine::Consumable(consumable_id) => {
                sqlx::query(
                    r#"
                    INSERT INTO consumable_stocks (consumable_id, warehouse_id, quantity)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (consumable_id, warehouse_id)
                    DO UPDATE SET quantity = consumable_stocks.quantity + EXCLUDED.quantity,
                                  updated_at = NOW()
                    "#,
                )
                .bind(consumable_id)
                .bind(warehouse_id)
                .bind(item.quantity)
                .execute(&mut *conn)
                .await?;
            }
            ProcurementLine::AssetModel(model_id) => {
                let model_code =
                    sqlx::query_scalar::<_, String>("SELECT code FROM asset_models WHERE id = $1")
                        .bind(model_id)
                        .fetch_optional(&mut *conn)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Asset model".to_string()))?;

                AssetService::materialize(
                    &mut *conn,
                    asset_config,
                    NewAssetBatch {
                        model_id,
                        model_code: &model_code,
                        locations: vec![AssetLocation::Warehouse(warehouse_id); item.quantity.max(0) as usize],
                        movement_status: MovementStatus::InStore,
                        distribution_id: None,
                    },
                )
                .await?;
            }
        }
    }
    Ok(())
}

async fn append_timeline(
    conn: &mut PgConnection,
    procurement_id: Uuid,
    status: ProcurementStatus,
    notes: Option<&str>,
    actor_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO procurement_timelines (procurement_id, status, notes, actor_id) VALUES ($1, $2, $3, $4)",
    )
    .bind(procurement_id)
    .bind(status.as_str())
    .bind(notes)
    .bind(actor_id)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumable_line(quantity: i32) -> ProcurementItemInput {
        ProcurementItemInput {
            consumable_id: Some(Uuid::new_v4()),
            asset_model_id: None,
            quantity,
            unit_price: None,
        }
    }

    #[test]
    fn test_valid_mixed_lines() {
        let items = vec![
            consumable_line(5),
            ProcurementItemInput {
                consumable_id: None,
                asset_model_id: Some(Uuid::new_v4()),
                quantity: 2,
                unit_price: Some(Decimal::new(1250000, 2)),
            },
        ];
        let lines = validate_procurement_items(&items).unwrap();
        assert!(matches!(lines[0], ProcurementLine::Consumable(_)));
        assert!(matches!(lines[1], ProcurementLine::AssetModel(_)));
    }

    #[test]
    fn test_line_must_name_exactly_one_entry() {
        let both = ProcurementItemInput {
            consumable_id: Some(Uuid::new_v4()),
            asset_model_id: Some(Uuid::new_v4()),
            quantity: 1,
            unit_price: None,
        };
        assert!(validate_procurement_items(&[both]).is_err());

        let neither = ProcurementItemInput {
            consumable_id: None,
            asset_model_id: None,
            quantity: 1,
            unit_price: None,
        };
        assert!(validate_procurement_items(&[neither]).is_err());
    }

    #[test]
    fn test_rejects_empty_zero_negative_and_duplicates() {
        assert!(validate_procurement_items(&[]).is_err());
        assert!(validate_procurement_items(&[consumable_line(0)]).is_err());

        let mut priced = consumable_line(1);
        priced.unit_price = Some(Decimal::new(-1, 0));
        assert!(validate_procurement_items(&[priced]).is_err());

        let line = consumable_line(1);
        assert!(validate_procurement_items(&[line.clone(), line]).is_err());
    }

    mod workflow {
        use super::super::*;
        use crate::services::fixtures::{asset_config, count, seed};

        #[sqlx::test(migrations = "./migrations")]
        async fn test_completion_restocks_and_registers_assets(pool: PgPool) {
            let campus = seed(&pool).await;
            let service = ProcurementService::new(pool.clone());

            let detail = service
                .create(
                    &campus.warehouse_staff,
                    CreateProcurementInput {
                        warehouse_id: campus.warehouse_id,
                        description: Some("Term restock".to_string()),
                        items: vec![
                            ProcurementItemInput {
                                consumable_id: Some(campus.consumable_id),
                                asset_model_id: None,
                                quantity: 20,
                                unit_price: Some(Decimal::new(12050, 2)),
                            },
                            ProcurementItemInput {
                                consumable_id: None,
                                asset_model_id: Some(campus.model_id),
                                quantity: 3,
                                unit_price: None,
                            },
                        ],
                    },
                )
                .await
                .unwrap();
            let id = detail.procurement.id;
            assert_eq!(detail.procurement.status, ProcurementStatus::Pending);
            assert_eq!(detail.estimated_total, Decimal::new(241000, 2));

            let err = service
                .transition(
                    &campus.warehouse_staff,
                    id,
                    ProcurementAction::Complete,
                    TransitionInput::default(),
                    &asset_config(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidStateTransition(_)));

            service
                .transition(
                    &campus.faculty_admin,
                    id,
                    ProcurementAction::Approve,
                    TransitionInput::default(),
                    &asset_config(),
                )
                .await
                .unwrap();
            let done = service
                .transition(
                    &campus.warehouse_staff,
                    id,
                    ProcurementAction::Complete,
                    TransitionInput::default(),
                    &asset_config(),
                )
                .await
                .unwrap();
            assert_eq!(done.status, ProcurementStatus::Completed);

            let stock = sqlx::query_scalar::<_, i32>(
                "SELECT quantity FROM consumable_stocks WHERE consumable_id = $1 AND warehouse_id = $2",
            )
            .bind(campus.consumable_id)
            .bind(campus.warehouse_id)
            .fetch_one(&pool)
            .await
            .unwrap();
            assert_eq!(stock, 70);

            let in_store = count(
                &pool,
                "SELECT COUNT(*) FROM fixed_assets WHERE warehouse_id = $1 AND movement_status = 'IN_STORE'",
                campus.warehouse_id,
            )
            .await;
            assert_eq!(in_store, 3);
            assert_eq!(
                count(&pool, "SELECT COUNT(*) FROM procurement_timelines WHERE procurement_id = $1", id).await,
                3
            );
        }
    }
}
