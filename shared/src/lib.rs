//! Shared types and models for Inventa
//!
//! This crate contains the domain types and the pure business rules shared
//! between the backend server and the browser (via WASM): allocation checks,
//! receipt bounds, execution planning, asset tokens and the approval
//! workflow tables.

pub mod models;
pub mod types;
pub mod validation;
pub mod workflow;

pub use models::*;
pub use types::*;
pub use validation::*;
pub use workflow::*;
