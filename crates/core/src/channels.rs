//! Delivery channel names.
//!
//! The string constants must match the values stored in the
//! `delivery_outcomes.channel` column and used in API payloads.

use serde::{Deserialize, Serialize};

/// Push notification delivered to registered devices via FCM or APNs.
pub const CHANNEL_PUSH: &str = "push";

/// Templated email delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// In-app notification stored for the notification list and badge.
pub const CHANNEL_IN_APP: &str = "in_app";

/// A delivery transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Push,
    Email,
    InApp,
}

impl Channel {
    /// All channels in declaration order.
    pub const ALL: [Channel; 3] = [Channel::Push, Channel::Email, Channel::InApp];

    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Push => CHANNEL_PUSH,
            Channel::Email => CHANNEL_EMAIL,
            Channel::InApp => CHANNEL_IN_APP,
        }
    }

    /// Parse from the stored string, returning `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            CHANNEL_PUSH => Some(Channel::Push),
            CHANNEL_EMAIL => Some(Channel::Email),
            CHANNEL_IN_APP => Some(Channel::InApp),
            _ => None,
        }
    }
}
