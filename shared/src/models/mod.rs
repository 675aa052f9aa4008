//! Domain models for Inventa

mod asset;
mod audit;
mod distribution;
mod notification;
mod procurement;
mod request;
mod user;

pub use asset::*;
pub use audit::*;
pub use distribution::*;
pub use notification::*;
pub use procurement::*;
pub use request::*;
pub use user::*;
