//! Validation rules for Inventa
//!
//! Every function here is pure. The backend calls them before touching the
//! database; the browser calls the same code through the WASM bindings.

use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::models::TargetAllocation;

/// Maximum length of free-text notes and descriptions
pub const MAX_NOTES_LEN: usize = 1000;

/// Maximum length of a rejection reason
pub const MAX_REASON_LEN: usize = 500;

// ============================================================================
// Distribution allocation
// ============================================================================

/// Why a set of per-room allocations was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("Total quantity must be greater than zero, got {0}")]
    NonPositiveTotal(i32),

    #[error("At least one target room is required")]
    NoTargets,

    #[error("Allocated quantity for room {room_id} cannot be negative ({quantity})")]
    NegativeQuantity { room_id: Uuid, quantity: i32 },

    #[error("Room {0} appears more than once")]
    DuplicateRoom(Uuid),

    #[error("Allocated quantities sum to {allocated} but the total quantity is {total}")]
    SumMismatch { total: i32, allocated: i64 },
}

impl AllocationError {
    /// Request field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            AllocationError::NonPositiveTotal(_) => "total_quantity",
            AllocationError::SumMismatch { .. } => "total_quantity",
            _ => "targets",
        }
    }
}

/// Check that per-room quantities sum exactly to `total` and return the
/// allocations worth persisting (zero-quantity rooms are dropped).
///
/// This is the single check for the allocation invariant; every path that
/// writes targets goes through it.
pub fn validate_allocation(
    total: i32,
    allocations: &[TargetAllocation],
) -> Result<Vec<TargetAllocation>, AllocationError> {
    if total <= 0 {
        return Err(AllocationError::NonPositiveTotal(total));
    }
    if allocations.is_empty() {
        return Err(AllocationError::NoTargets);
    }

    let mut seen = HashSet::with_capacity(allocations.len());
    for allocation in allocations {
        if allocation.allocated_quantity < 0 {
            return Err(AllocationError::NegativeQuantity {
                room_id: allocation.room_id,
                quantity: allocation.allocated_quantity,
            });
        }
        if !seen.insert(allocation.room_id) {
            return Err(AllocationError::DuplicateRoom(allocation.room_id));
        }
    }

    let allocated = allocated_sum(allocations);
    if allocated != i64::from(total) {
        return Err(AllocationError::SumMismatch { total, allocated });
    }

    Ok(allocations
        .iter()
        .copied()
        .filter(|a| a.allocated_quantity > 0)
        .collect())
}

/// Sum of the proposed quantities, widened so large inputs cannot overflow
pub fn allocated_sum(allocations: &[TargetAllocation]) -> i64 {
    allocations
        .iter()
        .map(|a| i64::from(a.allocated_quantity))
        .sum()
}

/// How many units are still unassigned (negative when over-allocated)
pub fn remaining_to_allocate(total: i32, allocations: &[TargetAllocation]) -> i64 {
    i64::from(total) - allocated_sum(allocations)
}

// ============================================================================
// Receipt handshake
// ============================================================================

/// Why a receipt confirmation was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReceiptError {
    #[error("Received quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(i32),

    #[error("Nothing is pending for this target")]
    NothingPending,

    #[error("Received quantity {requested} exceeds the pending quantity {pending}")]
    ExceedsPending { requested: i32, pending: i32 },
}

/// Check a receipt of `quantity` units against a target's counters and
/// return the new received counter.
pub fn validate_receipt(allocated: i32, received: i32, quantity: i32) -> Result<i32, ReceiptError> {
    if quantity <= 0 {
        return Err(ReceiptError::NonPositiveQuantity(quantity));
    }
    let pending = allocated - received;
    if pending <= 0 {
        return Err(ReceiptError::NothingPending);
    }
    if quantity > pending {
        return Err(ReceiptError::ExceedsPending {
            requested: quantity,
            pending,
        });
    }
    Ok(received + quantity)
}

// ============================================================================
// Requests and procurements
// ============================================================================

/// Validate a list of (item id, quantity) lines: non-empty, positive, no repeats
pub fn validate_line_quantities(lines: &[(Uuid, i32)]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("At least one item is required");
    }
    let mut seen = HashSet::with_capacity(lines.len());
    for (id, quantity) in lines {
        if *quantity <= 0 {
            return Err("Item quantities must be greater than zero");
        }
        if !seen.insert(*id) {
            return Err("Each item may appear only once");
        }
    }
    Ok(())
}

/// Validate an approved quantity against what was requested
pub fn validate_approved_quantity(requested: i32, approved: i32) -> Result<(), &'static str> {
    if approved < 0 {
        return Err("Approved quantity cannot be negative");
    }
    if approved > requested {
        return Err("Approved quantity cannot exceed the requested quantity");
    }
    Ok(())
}

/// Validate a rejection reason
pub fn validate_rejection_reason(reason: Option<&str>) -> Result<(), &'static str> {
    match reason.map(str::trim) {
        None | Some("") => Err("A rejection reason is required"),
        Some(r) if r.chars().count() > MAX_REASON_LEN => {
            Err("Rejection reason must be at most 500 characters")
        }
        Some(_) => Ok(()),
    }
}

/// Validate optional free-text notes
pub fn validate_notes(notes: Option<&str>) -> Result<(), &'static str> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LEN => {
            Err("Notes must be at most 1000 characters")
        }
        _ => Ok(()),
    }
}
