//! In-app notification service
//!
//! Workflow services call the associated `notify_*` functions on their own
//! transaction; the instance methods back the notification center endpoints.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::NotificationRow;
use shared::{AuditEntity, Notification, NotificationType, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

/// Message body shared by every recipient of one event
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub entity: AuditEntity,
    pub entity_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread_only: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResult {
    pub updated: u64,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Notify a single user
    pub async fn notify_user(
        conn: &mut PgConnection,
        user_id: Uuid,
        message: &NotificationMessage,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message, entity_type, entity_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(message.notification_type.as_str())
        .bind(&message.title)
        .bind(&message.message)
        .bind(message.entity.as_str())
        .bind(message.entity_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Notify the unit members responsible for the given rooms
    pub async fn notify_room_units(
        conn: &mut PgConnection,
        room_ids: &[Uuid],
        message: &NotificationMessage,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message, entity_type, entity_id)
            SELECT DISTINCT u.id, $2, $3, $4, $5, $6
            FROM users u
            JOIN rooms r ON r.unit_id = u.unit_id
            WHERE r.id = ANY($1)
              AND u.role IN ('unit_admin', 'unit_staff')
            "#,
        )
        .bind(room_ids)
        .bind(message.notification_type.as_str())
        .bind(&message.title)
        .bind(&message.message)
        .bind(message.entity.as_str())
        .bind(message.entity_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// List the caller's notifications, newest first
    pub async fn list(
        &self,
        user_id: Uuid,
        query: NotificationQuery,
    ) -> AppResult<PaginatedResponse<Notification>> {
        let pagination = Pagination::from_query(query.page, query.per_page);
        let unread_only = query.unread_only.unwrap_or(false);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, notification_type, title, message, entity_type, entity_id,
                   is_read, read_at, created_at
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let notifications = rows.into_iter().map(Notification::from).collect();
        Ok(PaginatedResponse::new(notifications, &pagination, total.max(0) as u64))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<UnreadCount> {
        let unread = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(UnreadCount { unread })
    }

    /// Mark one of the caller's notifications as read
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, notification_type, title, message, entity_type, entity_id,
                      is_read, read_at, created_at
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification".to_string()))?;

        Ok(row.into())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<MarkAllReadResult> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW() WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        tracing::debug!(%user_id, updated = result.rows_affected(), "Marked notifications read");

        Ok(MarkAllReadResult {
            updated: result.rows_affected(),
        })
    }
}
