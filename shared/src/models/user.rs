//! Roles and per-endpoint role allow-lists

use serde::{Deserialize, Serialize};

/// Roles known to the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    WarehouseStaff,
    FacultyAdmin,
    UnitAdmin,
    UnitStaff,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::WarehouseStaff => "warehouse_staff",
            UserRole::FacultyAdmin => "faculty_admin",
            UserRole::UnitAdmin => "unit_admin",
            UserRole::UnitStaff => "unit_staff",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(UserRole::SuperAdmin),
            "warehouse_staff" => Some(UserRole::WarehouseStaff),
            "faculty_admin" => Some(UserRole::FacultyAdmin),
            "unit_admin" => Some(UserRole::UnitAdmin),
            "unit_staff" => Some(UserRole::UnitStaff),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles allowed to create, edit, delete and execute distributions
pub const DISTRIBUTION_MANAGERS: &[UserRole] = &[
    UserRole::SuperAdmin,
    UserRole::WarehouseStaff,
    UserRole::FacultyAdmin,
];

/// Roles allowed to confirm receipt of shipped units in a room
pub const RECEIPT_CONFIRMERS: &[UserRole] = &[UserRole::UnitStaff, UserRole::UnitAdmin];

/// Roles allowed to submit consumable requests
pub const REQUEST_SUBMITTERS: &[UserRole] = &[
    UserRole::SuperAdmin,
    UserRole::UnitAdmin,
    UserRole::UnitStaff,
];

/// Roles allowed to open procurements
pub const PROCUREMENT_SUBMITTERS: &[UserRole] =
    &[UserRole::SuperAdmin, UserRole::WarehouseStaff];

/// Roles allowed to read the audit log
pub const AUDIT_READERS: &[UserRole] = &[UserRole::SuperAdmin];
