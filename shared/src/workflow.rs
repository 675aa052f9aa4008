//! Approval workflows for requests and procurements
//!
//! Both workflows are expressed as a transition table mapping
//! `(current status, action, role)` to the next status. [`transition`] is the
//! only place a next status is computed; every endpoint goes through it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ProcurementStatus, RequestStatus, UserRole};

/// A status that participates in a workflow table
pub trait WorkflowState: Copy + Eq + fmt::Debug + 'static {
    fn as_str(&self) -> &'static str;
    fn is_terminal(&self) -> bool;
}

/// An action that participates in a workflow table
pub trait WorkflowAction: Copy + Eq + fmt::Debug + 'static {
    fn as_str(&self) -> &'static str;
}

/// One row of a workflow table
#[derive(Debug, Clone, Copy)]
pub struct TransitionRule<S: 'static, A: 'static> {
    pub from: &'static [S],
    pub action: A,
    pub roles: &'static [UserRole],
    pub to: S,
}

/// Why a transition was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Status {status} is final and cannot change")]
    Terminal { status: &'static str },

    #[error("Action {action} is not allowed while status is {from}")]
    NotAllowed {
        from: &'static str,
        action: &'static str,
    },

    #[error("Role {role} may not perform {action} while status is {from}")]
    RoleNotAllowed {
        role: &'static str,
        action: &'static str,
        from: &'static str,
    },
}

/// Compute the next status for `action` performed by `role` from `from`
pub fn transition<S, A>(
    rules: &[TransitionRule<S, A>],
    from: S,
    action: A,
    role: UserRole,
) -> Result<S, TransitionError>
where
    S: WorkflowState,
    A: WorkflowAction,
{
    if from.is_terminal() {
        return Err(TransitionError::Terminal {
            status: from.as_str(),
        });
    }

    let rule = rules
        .iter()
        .find(|rule| rule.action == action && rule.from.contains(&from))
        .ok_or(TransitionError::NotAllowed {
            from: from.as_str(),
            action: action.as_str(),
        })?;

    if !rule.roles.contains(&role) {
        return Err(TransitionError::RoleNotAllowed {
            role: role.as_str(),
            action: action.as_str(),
            from: from.as_str(),
        });
    }

    Ok(rule.to)
}

/// Actions `role` may perform from `from`, in table order
pub fn available_actions<S, A>(rules: &[TransitionRule<S, A>], from: S, role: UserRole) -> Vec<A>
where
    S: WorkflowState,
    A: WorkflowAction,
{
    if from.is_terminal() {
        return Vec::new();
    }
    let mut actions: Vec<A> = Vec::new();
    for rule in rules {
        if rule.from.contains(&from) && rule.roles.contains(&role) && !actions.contains(&rule.action) {
            actions.push(rule.action);
        }
    }
    actions
}

// ============================================================================
// Requests
// ============================================================================

impl WorkflowState for RequestStatus {
    fn as_str(&self) -> &'static str {
        RequestStatus::as_str(self)
    }

    fn is_terminal(&self) -> bool {
        RequestStatus::is_terminal(self)
    }
}

/// Actions that move a request through its workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestAction {
    ApproveUnit,
    ApproveFaculty,
    StartProcessing,
    MarkReady,
    Complete,
    Reject,
    Cancel,
}

impl RequestAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approve_unit" => Some(RequestAction::ApproveUnit),
            "approve_faculty" => Some(RequestAction::ApproveFaculty),
            "start_processing" => Some(RequestAction::StartProcessing),
            "mark_ready" => Some(RequestAction::MarkReady),
            "complete" => Some(RequestAction::Complete),
            "reject" => Some(RequestAction::Reject),
            "cancel" => Some(RequestAction::Cancel),
            _ => None,
        }
    }

    /// Confirmation shown to the actor after a successful transition
    pub fn success_message(&self) -> &'static str {
        match self {
            RequestAction::ApproveUnit => "Request approved by unit and forwarded to faculty",
            RequestAction::ApproveFaculty => "Request approved by faculty",
            RequestAction::StartProcessing => "Request is being processed by the warehouse",
            RequestAction::MarkReady => "Request is ready to pick up",
            RequestAction::Complete => "Request completed",
            RequestAction::Reject => "Request rejected",
            RequestAction::Cancel => "Request canceled",
        }
    }
}

impl WorkflowAction for RequestAction {
    fn as_str(&self) -> &'static str {
        match self {
            RequestAction::ApproveUnit => "approve_unit",
            RequestAction::ApproveFaculty => "approve_faculty",
            RequestAction::StartProcessing => "start_processing",
            RequestAction::MarkReady => "mark_ready",
            RequestAction::Complete => "complete",
            RequestAction::Reject => "reject",
            RequestAction::Cancel => "cancel",
        }
    }
}

const UNIT_APPROVERS: &[UserRole] = &[UserRole::UnitAdmin, UserRole::SuperAdmin];
const FACULTY_APPROVERS: &[UserRole] = &[UserRole::FacultyAdmin, UserRole::SuperAdmin];
const WAREHOUSE_OPERATORS: &[UserRole] = &[UserRole::WarehouseStaff, UserRole::SuperAdmin];
const REQUEST_CANCELERS: &[UserRole] = &[
    UserRole::UnitStaff,
    UserRole::UnitAdmin,
    UserRole::SuperAdmin,
];

const OPEN_REQUEST_STATUSES: &[RequestStatus] = &[
    RequestStatus::PendingUnit,
    RequestStatus::PendingFaculty,
    RequestStatus::Approved,
    RequestStatus::Processing,
    RequestStatus::ReadyToPickup,
];

/// Request workflow table
pub static REQUEST_TRANSITIONS: &[TransitionRule<RequestStatus, RequestAction>] = &[
    TransitionRule {
        from: &[RequestStatus::PendingUnit],
        action: RequestAction::ApproveUnit,
        roles: UNIT_APPROVERS,
        to: RequestStatus::PendingFaculty,
    },
    TransitionRule {
        from: &[RequestStatus::PendingFaculty],
        action: RequestAction::ApproveFaculty,
        roles: FACULTY_APPROVERS,
        to: RequestStatus::Approved,
    },
    TransitionRule {
        from: &[RequestStatus::Approved],
        action: RequestAction::StartProcessing,
        roles: WAREHOUSE_OPERATORS,
        to: RequestStatus::Processing,
    },
    TransitionRule {
        from: &[RequestStatus::Processing],
        action: RequestAction::MarkReady,
        roles: WAREHOUSE_OPERATORS,
        to: RequestStatus::ReadyToPickup,
    },
    TransitionRule {
        from: &[RequestStatus::ReadyToPickup],
        action: RequestAction::Complete,
        roles: WAREHOUSE_OPERATORS,
        to: RequestStatus::Completed,
    },
    TransitionRule {
        from: &[RequestStatus::PendingUnit],
        action: RequestAction::Reject,
        roles: UNIT_APPROVERS,
        to: RequestStatus::Rejected,
    },
    TransitionRule {
        from: &[RequestStatus::PendingFaculty],
        action: RequestAction::Reject,
        roles: FACULTY_APPROVERS,
        to: RequestStatus::Rejected,
    },
    TransitionRule {
        from: &[
            RequestStatus::Approved,
            RequestStatus::Processing,
            RequestStatus::ReadyToPickup,
        ],
        action: RequestAction::Reject,
        roles: WAREHOUSE_OPERATORS,
        to: RequestStatus::Rejected,
    },
    TransitionRule {
        from: OPEN_REQUEST_STATUSES,
        action: RequestAction::Cancel,
        roles: REQUEST_CANCELERS,
        to: RequestStatus::Canceled,
    },
];

/// Next request status for `action` by `role`
pub fn next_request_status(
    from: RequestStatus,
    action: RequestAction,
    role: UserRole,
) -> Result<RequestStatus, TransitionError> {
    transition(REQUEST_TRANSITIONS, from, action, role)
}

// ============================================================================
// Procurements
// ============================================================================

impl WorkflowState for ProcurementStatus {
    fn as_str(&self) -> &'static str {
        ProcurementStatus::as_str(self)
    }

    fn is_terminal(&self) -> bool {
        ProcurementStatus::is_terminal(self)
    }
}

/// Actions that move a procurement through its workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcurementAction {
    Approve,
    Reject,
    Complete,
}

impl ProcurementAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(ProcurementAction::Approve),
            "reject" => Some(ProcurementAction::Reject),
            "complete" => Some(ProcurementAction::Complete),
            _ => None,
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            ProcurementAction::Approve => "Procurement approved",
            ProcurementAction::Reject => "Procurement rejected",
            ProcurementAction::Complete => "Procurement completed and stock received",
        }
    }
}

impl WorkflowAction for ProcurementAction {
    fn as_str(&self) -> &'static str {
        match self {
            ProcurementAction::Approve => "approve",
            ProcurementAction::Reject => "reject",
            ProcurementAction::Complete => "complete",
        }
    }
}

/// Procurement workflow table
pub static PROCUREMENT_TRANSITIONS: &[TransitionRule<ProcurementStatus, ProcurementAction>] = &[
    TransitionRule {
        from: &[ProcurementStatus::Pending],
        action: ProcurementAction::Approve,
        roles: FACULTY_APPROVERS,
        to: ProcurementStatus::Approved,
    },
    TransitionRule {
        from: &[ProcurementStatus::Pending, ProcurementStatus::Approved],
        action: ProcurementAction::Reject,
        roles: FACULTY_APPROVERS,
        to: ProcurementStatus::Rejected,
    },
    TransitionRule {
        from: &[ProcurementStatus::Approved],
        action: ProcurementAction::Complete,
        roles: WAREHOUSE_OPERATORS,
        to: ProcurementStatus::Completed,
    },
];

/// Next procurement status for `action` by `role`
pub fn next_procurement_status(
    from: ProcurementStatus,
    action: ProcurementAction,
    role: UserRole,
) -> Result<ProcurementStatus, TransitionError> {
    transition(PROCUREMENT_TRANSITIONS, from, action, role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_happy_path() {
        let steps = [
            (RequestAction::ApproveUnit, UserRole::UnitAdmin, RequestStatus::PendingFaculty),
            (RequestAction::ApproveFaculty, UserRole::FacultyAdmin, RequestStatus::Approved),
            (RequestAction::StartProcessing, UserRole::WarehouseStaff, RequestStatus::Processing),
            (RequestAction::MarkReady, UserRole::WarehouseStaff, RequestStatus::ReadyToPickup),
            (RequestAction::Complete, UserRole::WarehouseStaff, RequestStatus::Completed),
        ];

        let mut status = RequestStatus::PendingUnit;
        for (action, role, expected) in steps {
            status = next_request_status(status, action, role).unwrap();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn test_unit_approval_cannot_skip_ahead() {
        let next = next_request_status(
            RequestStatus::PendingUnit,
            RequestAction::ApproveUnit,
            UserRole::UnitAdmin,
        )
        .unwrap();
        assert_ne!(next, RequestStatus::Approved);
        assert_ne!(next, RequestStatus::Completed);

        assert!(matches!(
            next_request_status(RequestStatus::PendingUnit, RequestAction::Complete, UserRole::SuperAdmin),
            Err(TransitionError::NotAllowed { .. })
        ));
        assert!(matches!(
            next_request_status(
                RequestStatus::PendingUnit,
                RequestAction::ApproveFaculty,
                UserRole::FacultyAdmin
            ),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_wrong_role_is_refused() {
        let err = next_request_status(
            RequestStatus::PendingUnit,
            RequestAction::ApproveUnit,
            UserRole::UnitStaff,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::RoleNotAllowed {
                role: "unit_staff",
                action: "approve_unit",
                from: "PENDING_UNIT",
            }
        );
    }

    #[test]
    fn test_reject_roles_follow_the_gate() {
        assert!(next_request_status(
            RequestStatus::PendingFaculty,
            RequestAction::Reject,
            UserRole::UnitAdmin
        )
        .is_err());
        assert_eq!(
            next_request_status(
                RequestStatus::Processing,
                RequestAction::Reject,
                UserRole::WarehouseStaff
            ),
            Ok(RequestStatus::Rejected)
        );
    }

    #[test]
    fn test_terminal_statuses_accept_nothing() {
        for status in [
            RequestStatus::Completed,
            RequestStatus::Rejected,
            RequestStatus::Canceled,
        ] {
            assert_eq!(
                next_request_status(status, RequestAction::Cancel, UserRole::SuperAdmin),
                Err(TransitionError::Terminal {
                    status: status.as_str()
                })
            );
            assert!(available_actions(REQUEST_TRANSITIONS, status, UserRole::SuperAdmin).is_empty());
        }
    }

    #[test]
    fn test_available_actions_for_unit_admin() {
        let actions = available_actions(
            REQUEST_TRANSITIONS,
            RequestStatus::PendingUnit,
            UserRole::UnitAdmin,
        );
        assert_eq!(
            actions,
            vec![RequestAction::ApproveUnit, RequestAction::Reject, RequestAction::Cancel]
        );
    }

    #[test]
    fn test_procurement_flow() {
        let approved = next_procurement_status(
            ProcurementStatus::Pending,
            ProcurementAction::Approve,
            UserRole::FacultyAdmin,
        )
        .unwrap();
        assert_eq!(approved, ProcurementStatus::Approved);

        let completed =
            next_procurement_status(approved, ProcurementAction::Complete, UserRole::WarehouseStaff)
                .unwrap();
        assert_eq!(completed, ProcurementStatus::Completed);

        assert!(next_procurement_status(
            ProcurementStatus::Pending,
            ProcurementAction::Complete,
            UserRole::WarehouseStaff
        )
        .is_err());
    }

    #[test]
    fn test_action_names_parse_back() {
        for action in [
            RequestAction::ApproveUnit,
            RequestAction::ApproveFaculty,
            RequestAction::StartProcessing,
            RequestAction::MarkReady,
            RequestAction::Complete,
            RequestAction::Reject,
            RequestAction::Cancel,
        ] {
            assert_eq!(RequestAction::from_str(action.as_str()), Some(action));
        }
    }
}
