//! Consumable request models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A consumable requisition raised by a unit for one of its rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub code: String,
    pub requester_id: Uuid,
    pub room_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: RequestStatus,
    pub description: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request approval lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    PendingUnit,
    PendingFaculty,
    Approved,
    Processing,
    ReadyToPickup,
    Completed,
    Rejected,
    Canceled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 8] = [
        RequestStatus::PendingUnit,
        RequestStatus::PendingFaculty,
        RequestStatus::Approved,
        RequestStatus::Processing,
        RequestStatus::ReadyToPickup,
        RequestStatus::Completed,
        RequestStatus::Rejected,
        RequestStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::PendingUnit => "PENDING_UNIT",
            RequestStatus::PendingFaculty => "PENDING_FACULTY",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Processing => "PROCESSING",
            RequestStatus::ReadyToPickup => "READY_TO_PICKUP",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Canceled => "CANCELED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Rejected | RequestStatus::Canceled
        )
    }
}

/// One consumable line of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestItem {
    pub id: Uuid,
    pub request_id: Uuid,
    pub consumable_id: Uuid,
    pub quantity_requested: i32,
    /// Set by the faculty approval; `None` until then
    pub quantity_approved: Option<i32>,
}

impl RequestItem {
    /// Quantity the warehouse hands out for this line
    pub fn quantity_to_issue(&self) -> i32 {
        self.quantity_approved.unwrap_or(self.quantity_requested)
    }
}

/// Append-only status history row, shared by requests and procurements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry<S> {
    pub id: Uuid,
    pub status: S,
    pub notes: Option<String>,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A request with its items and timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: Request,
    pub items: Vec<RequestItem>,
    pub timeline: Vec<TimelineEntry<RequestStatus>>,
}
