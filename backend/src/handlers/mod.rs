//! HTTP handlers for Inventa

pub mod asset;
pub mod audit;
pub mod dashboard;
pub mod distribution;
pub mod health;
pub mod notification;
pub mod procurement;
pub mod request;

pub use asset::*;
pub use audit::*;
pub use dashboard::*;
pub use distribution::*;
pub use health::*;
pub use notification::*;
pub use procurement::*;
pub use request::*;
