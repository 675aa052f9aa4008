//! Business logic services for Inventa

pub mod asset;
pub mod audit;
pub mod dashboard;
pub mod distribution;
pub mod document_code;
#[cfg(test)]
pub mod fixtures;
pub mod notification;
pub mod procurement;
pub mod request;
