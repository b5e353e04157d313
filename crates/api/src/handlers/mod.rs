pub mod analytics;
pub mod devices;
pub mod notification;
pub mod preferences;
