//! Asset distribution ("dropping") models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bulk allocation of one asset model across destination rooms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub id: Uuid,
    pub code: String,
    pub model_id: Uuid,
    pub total_quantity: i32,
    pub status: DistributionStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Distribution lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionStatus {
    Draft,
    Shipped,
    Completed,
}

impl DistributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionStatus::Draft => "DRAFT",
            DistributionStatus::Shipped => "SHIPPED",
            DistributionStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(DistributionStatus::Draft),
            "SHIPPED" => Some(DistributionStatus::Shipped),
            "COMPLETED" => Some(DistributionStatus::Completed),
            _ => None,
        }
    }
}

/// One room's share within a distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionTarget {
    pub id: Uuid,
    pub distribution_id: Uuid,
    pub room_id: Uuid,
    pub allocated_quantity: i32,
    pub received_quantity: i32,
    pub receiver_id: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
}

impl DistributionTarget {
    /// Units shipped to this room that have not been confirmed yet
    pub fn pending(&self) -> i32 {
        self.allocated_quantity - self.received_quantity
    }

    pub fn is_fully_received(&self) -> bool {
        self.pending() <= 0
    }
}

/// A distribution together with its targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionDetail {
    #[serde(flatten)]
    pub distribution: Distribution,
    pub targets: Vec<DistributionTarget>,
}

/// A proposed per-room quantity, as submitted when drafting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetAllocation {
    pub room_id: Uuid,
    pub allocated_quantity: i32,
}

/// True once every target has received its full allocation
pub fn all_targets_received(targets: &[DistributionTarget]) -> bool {
    targets.iter().all(DistributionTarget::is_fully_received)
}

/// Expand targets into one destination room per unit to materialize.
///
/// The result has exactly `sum(allocated_quantity)` entries, grouped by target
/// in input order.
pub fn plan_execution(targets: &[DistributionTarget]) -> Vec<Uuid> {
    targets
        .iter()
        .flat_map(|t| std::iter::repeat(t.room_id).take(t.allocated_quantity.max(0) as usize))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(room_id: Uuid, allocated: i32, received: i32) -> DistributionTarget {
        DistributionTarget {
            id: Uuid::new_v4(),
            distribution_id: Uuid::nil(),
            room_id,
            allocated_quantity: allocated,
            received_quantity: received,
            receiver_id: None,
            received_at: None,
        }
    }

    #[test]
    fn test_plan_execution_counts_per_room() {
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();
        let plan = plan_execution(&[target(room_a, 3, 0), target(room_b, 2, 0)]);

        assert_eq!(plan.len(), 5);
        assert_eq!(plan.iter().filter(|r| **r == room_a).count(), 3);
        assert_eq!(plan.iter().filter(|r| **r == room_b).count(), 2);
    }

    #[test]
    fn test_pending_and_completion() {
        let room = Uuid::new_v4();
        let partial = target(room, 10, 4);
        assert_eq!(partial.pending(), 6);
        assert!(!partial.is_fully_received());

        let done = target(room, 10, 10);
        assert!(done.is_fully_received());

        assert!(!all_targets_received(&[partial.clone(), done.clone()]));
        assert!(all_targets_received(&[done]));
    }

    #[test]
    fn test_status_names() {
        assert_eq!(DistributionStatus::from_str("DRAFT"), Some(DistributionStatus::Draft));
        assert_eq!(DistributionStatus::Shipped.as_str(), "SHIPPED");
        assert_eq!(DistributionStatus::from_str("draft"), None);
    }
}
