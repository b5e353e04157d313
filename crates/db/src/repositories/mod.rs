//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod delivery_outcome_repo;
pub mod device_token_repo;
pub mod notification_repo;
pub mod preference_repo;

pub use delivery_outcome_repo::DeliveryOutcomeRepo;
pub use device_token_repo::DeviceTokenRepo;
pub use notification_repo::NotificationRepo;
pub use preference_repo::PreferenceRepo;
