//! Approval workflow tests
//!
//! Tests for the request and procurement state machines:
//! - Property 6: Terminal Statuses Accept No Action
//! - Property 7: Only Listed Roles May Transition

use proptest::prelude::*;
use shared::{
    available_actions, next_procurement_status, next_request_status, ProcurementAction,
    ProcurementStatus, RequestAction, RequestStatus, TransitionError, UserRole,
    PROCUREMENT_TRANSITIONS, REQUEST_TRANSITIONS,
};

const ROLES: [UserRole; 5] = [
    UserRole::SuperAdmin,
    UserRole::WarehouseStaff,
    UserRole::FacultyAdmin,
    UserRole::UnitAdmin,
    UserRole::UnitStaff,
];

const REQUEST_ACTIONS: [RequestAction; 7] = [
    RequestAction::ApproveUnit,
    RequestAction::ApproveFaculty,
    RequestAction::StartProcessing,
    RequestAction::MarkReady,
    RequestAction::Complete,
    RequestAction::Reject,
    RequestAction::Cancel,
];

const PROCUREMENT_ACTIONS: [ProcurementAction; 3] = [
    ProcurementAction::Approve,
    ProcurementAction::Reject,
    ProcurementAction::Complete,
];

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_unit_approval_forwards_to_faculty() {
        assert_eq!(
            next_request_status(
                RequestStatus::PendingUnit,
                RequestAction::ApproveUnit,
                UserRole::UnitAdmin
            ),
            Ok(RequestStatus::PendingFaculty)
        );
    }

    #[test]
    fn test_unit_staff_cannot_approve() {
        assert!(matches!(
            next_request_status(
                RequestStatus::PendingUnit,
                RequestAction::ApproveUnit,
                UserRole::UnitStaff
            ),
            Err(TransitionError::RoleNotAllowed { .. })
        ));
    }

    #[test]
    fn test_steps_cannot_be_skipped() {
        assert!(matches!(
            next_request_status(
                RequestStatus::PendingUnit,
                RequestAction::ApproveFaculty,
                UserRole::FacultyAdmin
            ),
            Err(TransitionError::NotAllowed { .. })
        ));
        assert!(matches!(
            next_request_status(
                RequestStatus::Approved,
                RequestAction::Complete,
                UserRole::WarehouseStaff
            ),
            Err(TransitionError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_reject_is_routed_by_stage() {
        assert_eq!(
            next_request_status(
                RequestStatus::PendingFaculty,
                RequestAction::Reject,
                UserRole::FacultyAdmin
            ),
            Ok(RequestStatus::Rejected)
        );
        assert!(next_request_status(
            RequestStatus::PendingFaculty,
            RequestAction::Reject,
            UserRole::UnitAdmin
        )
        .is_err());
    }

    #[test]
    fn test_cancel_allowed_while_open() {
        for status in [
            RequestStatus::PendingUnit,
            RequestStatus::Approved,
            RequestStatus::ReadyToPickup,
        ] {
            assert_eq!(
                next_request_status(status, RequestAction::Cancel, UserRole::UnitStaff),
                Ok(RequestStatus::Canceled)
            );
        }
    }

    #[test]
    fn test_procurement_path() {
        assert_eq!(
            next_procurement_status(
                ProcurementStatus::Pending,
                ProcurementAction::Approve,
                UserRole::FacultyAdmin
            ),
            Ok(ProcurementStatus::Approved)
        );
        assert_eq!(
            next_procurement_status(
                ProcurementStatus::Approved,
                ProcurementAction::Complete,
                UserRole::WarehouseStaff
            ),
            Ok(ProcurementStatus::Completed)
        );
        assert!(next_procurement_status(
            ProcurementStatus::Pending,
            ProcurementAction::Complete,
            UserRole::WarehouseStaff
        )
        .is_err());
    }

    #[test]
    fn test_action_names_parse_back() {
        for action in REQUEST_ACTIONS {
            let name = serde_json::to_value(action).unwrap();
            assert_eq!(RequestAction::from_str(name.as_str().unwrap()), Some(action));
        }
        for action in PROCUREMENT_ACTIONS {
            let name = serde_json::to_value(action).unwrap();
            assert_eq!(
                ProcurementAction::from_str(name.as_str().unwrap()),
                Some(action)
            );
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn role_strategy() -> impl Strategy<Value = UserRole> {
    prop::sample::select(ROLES.to_vec())
}

fn request_status_strategy() -> impl Strategy<Value = RequestStatus> {
    prop::sample::select(RequestStatus::ALL.to_vec())
}

fn request_action_strategy() -> impl Strategy<Value = RequestAction> {
    prop::sample::select(REQUEST_ACTIONS.to_vec())
}

fn procurement_status_strategy() -> impl Strategy<Value = ProcurementStatus> {
    prop::sample::select(ProcurementStatus::ALL.to_vec())
}

fn procurement_action_strategy() -> impl Strategy<Value = ProcurementAction> {
    prop::sample::select(PROCUREMENT_ACTIONS.to_vec())
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property 6: Terminal Statuses Accept No Action
        #[test]
        fn prop_terminal_request_is_final(
            status in request_status_strategy(),
            action in request_action_strategy(),
            role in role_strategy()
        ) {
            prop_assume!(status.is_terminal());
            let is_terminal_error = matches!(
                next_request_status(status, action, role),
                Err(TransitionError::Terminal { .. })
            );
            prop_assert!(is_terminal_error);
            prop_assert!(available_actions(REQUEST_TRANSITIONS, status, role).is_empty());
        }

        /// Property 6: Terminal procurement statuses accept no action either
        #[test]
        fn prop_terminal_procurement_is_final(
            status in procurement_status_strategy(),
            action in procurement_action_strategy(),
            role in role_strategy()
        ) {
            prop_assume!(status.is_terminal());
            prop_assert!(next_procurement_status(status, action, role).is_err());
            prop_assert!(available_actions(PROCUREMENT_TRANSITIONS, status, role).is_empty());
        }

        /// Property 7: Only Listed Roles May Transition
        /// A transition succeeds exactly when the action is offered to the role
        #[test]
        fn prop_request_transition_matches_available_actions(
            status in request_status_strategy(),
            action in request_action_strategy(),
            role in role_strategy()
        ) {
            let offered = available_actions(REQUEST_TRANSITIONS, status, role).contains(&action);
            let result = next_request_status(status, action, role);
            prop_assert_eq!(result.is_ok(), offered);
        }

        /// Property 7: Same for procurements
        #[test]
        fn prop_procurement_transition_matches_available_actions(
            status in procurement_status_strategy(),
            action in procurement_action_strategy(),
            role in role_strategy()
        ) {
            let offered = available_actions(PROCUREMENT_TRANSITIONS, status, role).contains(&action);
            let result = next_procurement_status(status, action, role);
            prop_assert_eq!(result.is_ok(), offered);
        }

        /// Unit staff never move a request anywhere except to canceled
        #[test]
        fn prop_unit_staff_only_cancel(
            status in request_status_strategy(),
            action in request_action_strategy()
        ) {
            if let Ok(next) = next_request_status(status, action, UserRole::UnitStaff) {
                prop_assert_eq!(next, RequestStatus::Canceled);
            }
        }
    }
}
