//! Database models for Inventa
//!
//! Database row types and their decoding into the shared models.

pub mod rows;

pub use rows::*;
