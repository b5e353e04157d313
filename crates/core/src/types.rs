/// Notification primary keys are UUIDv7, so they sort by creation time.
pub type NotificationId = uuid::Uuid;

/// Users are owned by the external identity service; we only see the opaque id.
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
