//! Distribution execution and receipt tests
//!
//! Tests for the shipping handshake:
//! - Property 3: Execution Materializes One Unit Per Allocation
//! - Property 4: Receipt Bounds
//! - Property 5: Completion Requires Every Target Received

use proptest::prelude::*;
use shared::{
    all_targets_received, plan_execution, validate_receipt, DistributionTarget, ReceiptError,
};
use uuid::Uuid;

fn target(allocated: i32, received: i32) -> DistributionTarget {
    DistributionTarget {
        id: Uuid::new_v4(),
        distribution_id: Uuid::nil(),
        room_id: Uuid::new_v4(),
        allocated_quantity: allocated,
        received_quantity: received,
        receiver_id: None,
        received_at: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_plan_keeps_target_order() {
        let first = target(2, 0);
        let second = target(1, 0);
        let plan = plan_execution(&[first.clone(), second.clone()]);
        assert_eq!(plan, vec![first.room_id, first.room_id, second.room_id]);
    }

    #[test]
    fn test_plan_of_empty_targets_is_empty() {
        assert!(plan_execution(&[]).is_empty());
    }

    #[test]
    fn test_partial_receipts_accumulate() {
        let received = validate_receipt(10, 0, 4).unwrap();
        assert_eq!(received, 4);
        let received = validate_receipt(10, received, 6).unwrap();
        assert_eq!(received, 10);
        assert_eq!(
            validate_receipt(10, received, 1),
            Err(ReceiptError::NothingPending)
        );
    }

    #[test]
    fn test_receipt_rejects_non_positive_quantity() {
        assert_eq!(
            validate_receipt(10, 0, 0),
            Err(ReceiptError::NonPositiveQuantity(0))
        );
        assert_eq!(
            validate_receipt(10, 0, -1),
            Err(ReceiptError::NonPositiveQuantity(-1))
        );
    }

    #[test]
    fn test_receipt_rejects_over_receipt() {
        assert_eq!(
            validate_receipt(10, 7, 4),
            Err(ReceiptError::ExceedsPending {
                requested: 4,
                pending: 3
            })
        );
    }

    #[test]
    fn test_completion_needs_every_target() {
        let done = target(5, 5);
        let partial = target(5, 2);
        assert!(all_targets_received(&[done.clone()]));
        assert!(!all_targets_received(&[done, partial]));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn allocations_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(1i32..=200, 1..10)
}

/// (allocated, received) with received <= allocated
fn counters_strategy() -> impl Strategy<Value = (i32, i32)> {
    (1i32..=1000).prop_flat_map(|allocated| (Just(allocated), 0..=allocated))
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 3: Execution Materializes One Unit Per Allocation
        /// Each room appears in the plan exactly as often as its allocation
        #[test]
        fn prop_plan_matches_allocations(allocations in allocations_strategy()) {
            let targets: Vec<DistributionTarget> =
                allocations.iter().map(|q| target(*q, 0)).collect();
            let plan = plan_execution(&targets);

            let total: i32 = allocations.iter().sum();
            prop_assert_eq!(plan.len(), total as usize);
            for t in &targets {
                let count = plan.iter().filter(|room| **room == t.room_id).count();
                prop_assert_eq!(count, t.allocated_quantity as usize);
            }
        }

        /// Property 4: Receipt Bounds
        /// Any quantity within the pending range is accepted and never overshoots
        #[test]
        fn prop_receipt_within_pending_accepted(
            (allocated, received) in counters_strategy(),
            pick in 0.0f64..1.0
        ) {
            let pending = allocated - received;
            prop_assume!(pending > 0);
            let quantity = 1 + ((pending - 1) as f64 * pick) as i32;

            let new_received = validate_receipt(allocated, received, quantity).unwrap();
            prop_assert_eq!(new_received, received + quantity);
            prop_assert!(new_received <= allocated);
        }

        /// Property 4: Quantities beyond what is pending are always refused
        #[test]
        fn prop_receipt_over_pending_rejected(
            (allocated, received) in counters_strategy(),
            extra in 1i32..=100
        ) {
            let pending = allocated - received;
            let result = validate_receipt(allocated, received, pending + extra);
            prop_assert!(result.is_err());
        }

        /// Property 5: Completion Requires Every Target Received
        /// The distribution completes only when no target has units pending
        #[test]
        fn prop_completion_iff_nothing_pending(
            counters in prop::collection::vec(counters_strategy(), 1..8)
        ) {
            let targets: Vec<DistributionTarget> =
                counters.iter().map(|(a, r)| target(*a, *r)).collect();
            let expected = counters.iter().all(|(a, r)| a == r);
            prop_assert_eq!(all_targets_received(&targets), expected);
        }
    }
}
