//! In-app notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    DistributionShipped,
    DistributionReceived,
    RequestStatusChanged,
    ProcurementStatusChanged,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::DistributionShipped => "distribution_shipped",
            NotificationType::DistributionReceived => "distribution_received",
            NotificationType::RequestStatusChanged => "request_status_changed",
            NotificationType::ProcurementStatusChanged => "procurement_status_changed",
            NotificationType::System => "system",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "distribution_shipped" => Some(NotificationType::DistributionShipped),
            "distribution_received" => Some(NotificationType::DistributionReceived),
            "request_status_changed" => Some(NotificationType::RequestStatusChanged),
            "procurement_status_changed" => Some(NotificationType::ProcurementStatusChanged),
            "system" => Some(NotificationType::System),
            _ => None,
        }
    }
}
