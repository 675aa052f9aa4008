//! Procurement (restocking) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TimelineEntry;

/// A restocking order for a warehouse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procurement {
    pub id: Uuid,
    pub code: String,
    pub requester_id: Uuid,
    pub warehouse_id: Uuid,
    pub status: ProcurementStatus,
    pub description: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Procurement lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcurementStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl ProcurementStatus {
    pub const ALL: [ProcurementStatus; 4] = [
        ProcurementStatus::Pending,
        ProcurementStatus::Approved,
        ProcurementStatus::Rejected,
        ProcurementStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcurementStatus::Pending => "PENDING",
            ProcurementStatus::Approved => "APPROVED",
            ProcurementStatus::Rejected => "REJECTED",
            ProcurementStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcurementStatus::Rejected | ProcurementStatus::Completed)
    }
}

/// What a procurement line restocks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ProcurementLine {
    Consumable(Uuid),
    AssetModel(Uuid),
}

impl ProcurementLine {
    /// Build a line from the two nullable columns; exactly one must be set
    pub fn from_columns(consumable_id: Option<Uuid>, asset_model_id: Option<Uuid>) -> Option<Self> {
        match (consumable_id, asset_model_id) {
            (Some(id), None) => Some(ProcurementLine::Consumable(id)),
            (None, Some(id)) => Some(ProcurementLine::AssetModel(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementItem {
    pub id: Uuid,
    pub procurement_id: Uuid,
    pub line: ProcurementLine,
    pub quantity: i32,
    pub unit_price: Option<Decimal>,
}

/// A procurement with its items and timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementDetail {
    #[serde(flatten)]
    pub procurement: Procurement,
    pub items: Vec<ProcurementItem>,
    pub estimated_total: Decimal,
    pub timeline: Vec<TimelineEntry<ProcurementStatus>>,
}

/// Sum of `unit_price * quantity` over priced lines. Unpriced lines count as zero.
pub fn estimated_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (i32, Option<Decimal>)>,
{
    lines
        .into_iter()
        .filter_map(|(quantity, price)| price.map(|p| p * Decimal::from(quantity)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_estimated_total_skips_unpriced_lines() {
        let total = estimated_total([
            (3, Some(Decimal::from_str("12.50").unwrap())),
            (10, None),
            (2, Some(Decimal::from(100))),
        ]);
        assert_eq!(total, Decimal::from_str("237.50").unwrap());
    }

    #[test]
    fn test_line_from_columns() {
        let id = Uuid::new_v4();
        assert_eq!(
            ProcurementLine::from_columns(Some(id), None),
            Some(ProcurementLine::Consumable(id))
        );
        assert_eq!(
            ProcurementLine::from_columns(None, Some(id)),
            Some(ProcurementLine::AssetModel(id))
        );
        assert_eq!(ProcurementLine::from_columns(Some(id), Some(id)), None);
    }
}
