//! Append-only audit log
//!
//! Entries are written inside the transaction of the mutation they describe,
//! so a rolled-back operation leaves no audit trace.

use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::AuditLogRow;
use shared::{AuditEntity, AuditLogEntry, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

/// Filters for the audit log viewer
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one entry on the caller's connection
    pub async fn record(
        conn: &mut PgConnection,
        actor_id: Uuid,
        action: &str,
        entity: AuditEntity,
        entity_id: Uuid,
        detail: Value,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(entity.as_str())
        .bind(entity_id)
        .bind(detail)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Newest-first page of entries
    pub async fn list(&self, query: AuditLogQuery) -> AppResult<PaginatedResponse<AuditLogEntry>> {
        if let Some(entity_type) = query.entity_type.as_deref() {
            if AuditEntity::from_str(entity_type).is_none() {
                return Err(AppError::validation("entity_type", "Unknown entity type"));
            }
        }

        let pagination = Pagination::from_query(query.page, query.per_page);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM audit_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
              AND ($3::uuid IS NULL OR actor_id = $3)
            "#,
        )
        .bind(&query.entity_type)
        .bind(query.entity_id)
        .bind(query.actor_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, actor_id, action, entity_type, entity_id, detail, created_at
            FROM audit_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::uuid IS NULL OR entity_id = $2)
              AND ($3::uuid IS NULL OR actor_id = $3)
            ORDER BY created_at DESC, id
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&query.entity_type)
        .bind(query.entity_id)
        .bind(query.actor_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let entries = rows.into_iter().map(AuditLogEntry::from).collect();
        Ok(PaginatedResponse::new(entries, &pagination, total.max(0) as u64))
    }
}
