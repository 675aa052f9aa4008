//! Audit log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Entity kinds recorded in the audit log
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Distribution,
    DistributionTarget,
    Request,
    Procurement,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntity::Distribution => "distribution",
            AuditEntity::DistributionTarget => "distribution_target",
            AuditEntity::Request => "request",
            AuditEntity::Procurement => "procurement",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "distribution" => Some(AuditEntity::Distribution),
            "distribution_target" => Some(AuditEntity::DistributionTarget),
            "request" => Some(AuditEntity::Request),
            "procurement" => Some(AuditEntity::Procurement),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_names_match_filter_values() {
        for entity in [
            AuditEntity::Distribution,
            AuditEntity::DistributionTarget,
            AuditEntity::Request,
            AuditEntity::Procurement,
        ] {
            assert_eq!(AuditEntity::from_str(entity.as_str()), Some(entity));
        }
        assert_eq!(AuditEntity::from_str("lot"), None);
    }
}
