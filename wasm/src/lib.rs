//! WebAssembly module for Inventa
//!
//! Provides client-side computation for:
//! - Distribution draft allocation checks
//! - Receipt bounds for the handshake form
//! - Workflow buttons available to the current role
//! - Procurement cost estimates

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;
pub use shared::workflow::*;

fn parse_allocations(targets_json: &str) -> Result<Vec<TargetAllocation>, JsValue> {
    serde_json::from_str(targets_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid targets JSON: {}", e)))
}

/// Validate a draft's per-room allocations. Returns an empty string when the
/// draft is valid, otherwise the message to show next to the form.
#[wasm_bindgen]
pub fn validate_distribution_targets(total_quantity: i32, targets_json: &str) -> Result<String, JsValue> {
    let targets = parse_allocations(targets_json)?;
    Ok(match validate_allocation(total_quantity, &targets) {
        Ok(_) => String::new(),
        Err(e) => e.to_string(),
    })
}

/// Units still to be assigned to a room (negative when over-allocated)
#[wasm_bindgen]
pub fn remaining_units(total_quantity: i32, targets_json: &str) -> Result<f64, JsValue> {
    let targets = parse_allocations(targets_json)?;
    Ok(remaining_to_allocate(total_quantity, &targets) as f64)
}

/// Pending quantity for a target
#[wasm_bindgen]
pub fn pending_quantity(allocated: i32, received: i32) -> i32 {
    (allocated - received).max(0)
}

/// Whether a receipt of `quantity` units would be accepted
#[wasm_bindgen]
pub fn can_receive(allocated: i32, received: i32, quantity: i32) -> bool {
    validate_receipt(allocated, received, quantity).is_ok()
}

/// Request actions the given role can take from the given status, as an
/// array of action names (e.g. `["approve_unit", "reject", "cancel"]`)
#[wasm_bindgen]
pub fn request_actions(status: &str, role: &str) -> js_sys::Array {
    let actions = js_sys::Array::new();
    let (Some(status), Some(role)) = (RequestStatus::from_str(status), UserRole::from_str(role))
    else {
        web_sys::console::warn_1(&JsValue::from_str("request_actions: unknown status or role"));
        return actions;
    };

    for action in available_actions(REQUEST_TRANSITIONS, status, role) {
        actions.push(&JsValue::from_str(action.as_str()));
    }
    actions
}

/// Procurement actions the given role can take from the given status
#[wasm_bindgen]
pub fn procurement_actions(status: &str, role: &str) -> js_sys::Array {
    let actions = js_sys::Array::new();
    let (Some(status), Some(role)) =
        (ProcurementStatus::from_str(status), UserRole::from_str(role))
    else {
        web_sys::console::warn_1(&JsValue::from_str("procurement_actions: unknown status or role"));
        return actions;
    };

    for action in available_actions(PROCUREMENT_TRANSITIONS, status, role) {
        actions.push(&JsValue::from_str(action.as_str()));
    }
    actions
}

#[derive(serde::Deserialize)]
struct EstimateLine {
    quantity: i32,
    unit_price: Option<Decimal>,
}

/// Estimated procurement cost from `[{quantity, unit_price}]`, as a decimal string
#[wasm_bindgen]
pub fn estimate_procurement_total(lines_json: &str) -> Result<String, JsValue> {
    let lines: Vec<EstimateLine> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid lines JSON: {}", e)))?;
    let total = estimated_total(lines.into_iter().map(|l| (l.quantity, l.unit_price)));
    Ok(total.to_string())
}
