//! `FromRow` structs for raw SQL queries and their conversion into shared models.
//!
//! Status columns are stored as TEXT with CHECK constraints, so decoding a row
//! can still fail if the schema and the enums drift apart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    AssetCondition, AssetLocation, AuditLogEntry, Distribution, DistributionStatus,
    DistributionTarget, MovementStatus, Notification, NotificationType, PhysicalAsset,
    Procurement, ProcurementItem, ProcurementLine, ProcurementStatus, Request, RequestItem,
    RequestStatus, TimelineEntry,
};

pub const DISTRIBUTION_COLUMNS: &str = "id, code, model_id, total_quantity, status, notes, \
     created_by, executed_at, created_at, updated_at";

pub const TARGET_COLUMNS: &str = "id, distribution_id, room_id, allocated_quantity, \
     received_quantity, receiver_id, received_at";

pub const REQUEST_COLUMNS: &str = "id, code, requester_id, room_id, warehouse_id, status, \
     description, rejection_reason, created_at, updated_at";

pub const PROCUREMENT_COLUMNS: &str = "id, code, requester_id, warehouse_id, status, \
     description, rejection_reason, created_at, updated_at";

fn parse_column<T>(value: &str, column: &str, parse: impl Fn(&str) -> Option<T>) -> AppResult<T> {
    parse(value).ok_or_else(|| AppError::Internal(format!("unexpected {} value '{}'", column, value)))
}

// ============================================================================
// Distributions
// ============================================================================

#[derive(Debug, FromRow)]
pub struct DistributionRow {
    pub id: Uuid,
    pub code: String,
    pub model_id: Uuid,
    pub total_quantity: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DistributionRow> for Distribution {
    type Error = AppError;

    fn try_from(row: DistributionRow) -> AppResult<Self> {
        Ok(Distribution {
            status: parse_column(&row.status, "distribution status", DistributionStatus::from_str)?,
            id: row.id,
            code: row.code,
            model_id: row.model_id,
            total_quantity: row.total_quantity,
            notes: row.notes,
            created_by: row.created_by,
            executed_at: row.executed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct TargetRow {
    pub id: Uuid,
    pub distribution_id: Uuid,
    pub room_id: Uuid,
    pub allocated_quantity: i32,
    pub received_quantity: i32,
    pub receiver_id: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
}

impl From<TargetRow> for DistributionTarget {
    fn from(row: TargetRow) -> Self {
        DistributionTarget {
            id: row.id,
            distribution_id: row.distribution_id,
            room_id: row.room_id,
            allocated_quantity: row.allocated_quantity,
            received_quantity: row.received_quantity,
            receiver_id: row.receiver_id,
            received_at: row.received_at,
        }
    }
}

// ============================================================================
// Physical assets
// ============================================================================

#[derive(Debug, FromRow)]
pub struct AssetRow {
    pub id: Uuid,
    pub model_id: Uuid,
    pub room_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub movement_status: String,
    pub condition: String,
    pub qr_token: String,
    pub inventory_number: Option<String>,
    pub distribution_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AssetRow> for PhysicalAsset {
    type Error = AppError;

    fn try_from(row: AssetRow) -> AppResult<Self> {
        let location = AssetLocation::from_columns(row.room_id, row.warehouse_id).ok_or_else(|| {
            AppError::Internal(format!("asset {} has no single location", row.id))
        })?;

        Ok(PhysicalAsset {
            location,
            movement_status: parse_column(
                &row.movement_status,
                "movement status",
                MovementStatus::from_str,
            )?,
            condition: parse_column(&row.condition, "asset condition", AssetCondition::from_str)?,
            id: row.id,
            model_id: row.model_id,
            qr_token: row.qr_token,
            inventory_number: row.inventory_number,
            distribution_id: row.distribution_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, FromRow)]
pub struct RequestRow {
    pub id: Uuid,
    pub code: String,
    pub requester_id: Uuid,
    pub room_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: String,
    pub description: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for Request {
    type Error = AppError;

    fn try_from(row: RequestRow) -> AppResult<Self> {
        Ok(Request {
            status: parse_column(&row.status, "request status", RequestStatus::from_str)?,
            id: row.id,
            code: row.code,
            requester_id: row.requester_id,
            room_id: row.room_id,
            warehouse_id: row.warehouse_id,
            description: row.description,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct RequestItemRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub consumable_id: Uuid,
    pub quantity_requested: i32,
    pub quantity_approved: Option<i32>,
}

impl From<RequestItemRow> for RequestItem {
    fn from(row: RequestItemRow) -> Self {
        RequestItem {
            id: row.id,
            request_id: row.request_id,
            consumable_id: row.consumable_id,
            quantity_requested: row.quantity_requested,
            quantity_approved: row.quantity_approved,
        }
    }
}

/// A request or procurement timeline row
#[derive(Debug, FromRow)]
pub struct TimelineRow {
    pub id: Uuid,
    pub status: String,
    pub notes: Option<String>,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TimelineRow {
    pub fn into_entry<S>(self, parse: impl Fn(&str) -> Option<S>) -> AppResult<TimelineEntry<S>> {
        Ok(TimelineEntry {
            status: parse_column(&self.status, "timeline status", parse)?,
            id: self.id,
            notes: self.notes,
            actor_id: self.actor_id,
            created_at: self.created_at,
        })
    }
}

// ============================================================================
// Procurements
// ============================================================================

#[derive(Debug, FromRow)]
pub struct ProcurementRow {
    pub id: Uuid,
    pub code: String,
    pub requester_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: String,
    pub description: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProcurementRow> for Procurement {
    type Error = AppError;

    fn try_from(row: ProcurementRow) -> AppResult<Self> {
        Ok(Procurement {
            status: parse_column(&row.status, "procurement status", ProcurementStatus::from_str)?,
            id: row.id,
            code: row.code,
            requester_id: row.requester_id,
            warehouse_id: row.warehouse_id,
            description: row.description,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ProcurementItemRow {
    pub id: Uuid,
    pub procurement_id: Uuid,
    pub consumable_id: Option<Uuid>,
    pub asset_model_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

impl TryFrom<ProcurementItemRow> for ProcurementItem {
    type Error = AppError;

    fn try_from(row: ProcurementItemRow) -> AppResult<Self> {
        let line = ProcurementLine::from_columns(row.consumable_id, row.asset_model_id)
            .ok_or_else(|| {
                AppError::Internal(format!("procurement item {} has no single line", row.id))
            })?;

        Ok(ProcurementItem {
            id: row.id,
            procurement_id: row.procurement_id,
            line,
            quantity: row.quantity,
            unit_price: row.unit_price,
        })
    }
}

// ============================================================================
// Notifications and audit log
// ============================================================================

#[derive(Debug, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: row.id,
            user_id: row.user_id,
            notification_type: NotificationType::from_str(&row.notification_type)
                .unwrap_or(NotificationType::System),
            title: row.title,
            message: row.message,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        AuditLogEntry {
            id: row.id,
            actor_id: row.actor_id,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            detail: row.detail,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution_row(status: &str) -> DistributionRow {
        DistributionRow {
            id: Uuid::new_v4(),
            code: "DST-20241001-00001".into(),
            model_id: Uuid::new_v4(),
            total_quantity: 5,
            status: status.into(),
            notes: None,
            created_by: Uuid::new_v4(),
            executed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_distribution_row_conversion() {
        let distribution = Distribution::try_from(distribution_row("SHIPPED")).unwrap();
        assert_eq!(distribution.status, DistributionStatus::Shipped);

        let err = Distribution::try_from(distribution_row("LOST")).unwrap_err();
        assert!(matches!(err, AppError::Internal(ref msg) if msg.contains("LOST")));
    }

    #[test]
    fn test_asset_row_requires_single_location() {
        let row = AssetRow {
            id: Uuid::new_v4(),
            model_id: Uuid::new_v4(),
            room_id: None,
            warehouse_id: None,
            movement_status: "IN_STORE".into(),
            condition: "GOOD".into(),
            qr_token: "INV-PROJEC-0123456789ab".into(),
            inventory_number: None,
            distribution_id: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(PhysicalAsset::try_from(row).is_err());
    }

    #[test]
    fn test_timeline_row_into_entry() {
        let row = TimelineRow {
            id: Uuid::new_v4(),
            status: "PENDING_FACULTY".into(),
            notes: Some("ok".into()),
            actor_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let entry = row.into_entry(RequestStatus::from_str).unwrap();
        assert_eq!(entry.status, RequestStatus::PendingFaculty);
    }

    #[test]
    fn test_unknown_notification_type_falls_back_to_system() {
        let row = NotificationRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            notification_type: "legacy_alert".into(),
            title: "t".into(),
            message: "m".into(),
            entity_type: None,
            entity_id: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(Notification::from(row).notification_type, NotificationType::System);
    }
}
