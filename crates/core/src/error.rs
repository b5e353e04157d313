use crate::channels::Channel;
use crate::notification::NotificationType;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A notification type has no email template bound to it.
    #[error("No email template is mapped for notification type '{}'", .0.as_str())]
    UnmappedTemplate(NotificationType),

    /// A delivery transport could not take the message.
    #[error("Channel '{}' unavailable: {reason}", .channel.as_str())]
    ChannelUnavailable { channel: Channel, reason: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl CoreError {
    /// Shorthand for a missing notification record.
    pub fn notification_not_found(id: impl ToString) -> Self {
        CoreError::NotFound {
            entity: "Notification",
            id: id.to_string(),
        }
    }
}
