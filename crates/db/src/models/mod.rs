//! Entity models and DTOs.

pub mod delivery;
pub mod device_token;
pub mod notification;
