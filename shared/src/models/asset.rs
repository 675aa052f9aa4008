//! Individually tracked fixed asset units and their QR tokens

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One physically trackable asset unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalAsset {
    pub id: Uuid,
    pub model_id: Uuid,
    pub location: AssetLocation,
    pub movement_status: MovementStatus,
    pub condition: AssetCondition,
    pub qr_token: String,
    /// Assigned by the inventory office; empty for distribution-generated units
    pub inventory_number: Option<String>,
    pub distribution_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a unit currently sits. A unit is either in a room or in a warehouse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AssetLocation {
    Room(Uuid),
    Warehouse(Uuid),
}

impl AssetLocation {
    /// Build a location from the two nullable columns; exactly one must be set
    pub fn from_columns(room_id: Option<Uuid>, warehouse_id: Option<Uuid>) -> Option<Self> {
        match (room_id, warehouse_id) {
            (Some(room), None) => Some(AssetLocation::Room(room)),
            (None, Some(warehouse)) => Some(AssetLocation::Warehouse(warehouse)),
            _ => None,
        }
    }

    pub fn room_id(&self) -> Option<Uuid> {
        match self {
            AssetLocation::Room(id) => Some(*id),
            AssetLocation::Warehouse(_) => None,
        }
    }

    pub fn warehouse_id(&self) -> Option<Uuid> {
        match self {
            AssetLocation::Warehouse(id) => Some(*id),
            AssetLocation::Room(_) => None,
        }
    }
}

/// Physical-location lifecycle of an asset unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementStatus {
    InTransit,
    InStore,
    InUse,
    UnderRepair,
    Disposed,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::InTransit => "IN_TRANSIT",
            MovementStatus::InStore => "IN_STORE",
            MovementStatus::InUse => "IN_USE",
            MovementStatus::UnderRepair => "UNDER_REPAIR",
            MovementStatus::Disposed => "DISPOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "IN_TRANSIT" => Some(MovementStatus::InTransit),
            "IN_STORE" => Some(MovementStatus::InStore),
            "IN_USE" => Some(MovementStatus::InUse),
            "UNDER_REPAIR" => Some(MovementStatus::UnderRepair),
            "DISPOSED" => Some(MovementStatus::Disposed),
            _ => None,
        }
    }
}

/// Physical condition of an asset unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetCondition {
    #[default]
    Good,
    MinorDamage,
    MajorDamage,
    Broken,
}

impl AssetCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCondition::Good => "GOOD",
            AssetCondition::MinorDamage => "MINOR_DAMAGE",
            AssetCondition::MajorDamage => "MAJOR_DAMAGE",
            AssetCondition::Broken => "BROKEN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GOOD" => Some(AssetCondition::Good),
            "MINOR_DAMAGE" => Some(AssetCondition::MinorDamage),
            "MAJOR_DAMAGE" => Some(AssetCondition::MajorDamage),
            "BROKEN" => Some(AssetCondition::Broken),
            _ => None,
        }
    }
}

/// Length of the random hex part of an asset token
pub const TOKEN_RANDOM_HEX_LEN: usize = 12;

const MODEL_FRAGMENT_LEN: usize = 6;

/// Derive the model part of an asset token: the first six ASCII
/// alphanumerics of the model code, uppercased. Falls back to `GEN`.
pub fn model_fragment(model_code: &str) -> String {
    let fragment: String = model_code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MODEL_FRAGMENT_LEN)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if fragment.is_empty() {
        "GEN".to_string()
    } else {
        fragment
    }
}

/// Generate a QR token for one asset unit: `<prefix>-<model fragment>-<random hex>`.
///
/// Uniqueness is not checked here; callers insert with a conflict guard and
/// regenerate on collision.
pub fn generate_asset_token(prefix: &str, model_code: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        model_fragment(model_code),
        &random[..TOKEN_RANDOM_HEX_LEN]
    )
}
