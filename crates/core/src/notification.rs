//! Notification categories, device platforms, and typed payloads.
//!
//! Each [`NotificationType`] owns exactly one [`NotificationData`] variant, so
//! channel builders and analytics can match exhaustively instead of probing
//! optional fields.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum length of a notification title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of a notification message body, in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Key under which the category is added to flattened push data.
pub const DATA_KEY_NOTIFICATION_TYPE: &str = "notificationType";

// ---------------------------------------------------------------------------
// NotificationType
// ---------------------------------------------------------------------------

/// Category of a notification.
///
/// Declaration order is significant: it is the final tie-break when ranking
/// categories in analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    System,
    Message,
    Reservation,
    Review,
    Payment,
    Marketing,
}

impl NotificationType {
    /// All categories in declaration order.
    pub const ALL: [NotificationType; 6] = [
        NotificationType::System,
        NotificationType::Message,
        NotificationType::Reservation,
        NotificationType::Review,
        NotificationType::Payment,
        NotificationType::Marketing,
    ];

    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::System => "system",
            NotificationType::Message => "message",
            NotificationType::Reservation => "reservation",
            NotificationType::Review => "review",
            NotificationType::Payment => "payment",
            NotificationType::Marketing => "marketing",
        }
    }

    /// Parse from the stored string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        NotificationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown notification type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Device platform a push token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Ios, Platform::Android, Platform::Web];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Web => "web",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown platform '{s}'")))
    }

    /// iOS devices go through APNs; everything else through FCM.
    pub fn uses_apns(&self) -> bool {
        matches!(self, Platform::Ios)
    }
}

// ---------------------------------------------------------------------------
// Payload variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageData {
    pub sender_id: String,
    pub sender_name: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationData {
    pub reservation_id: String,
    pub listing_title: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewData {
    pub review_id: String,
    pub reviewer_name: String,
    /// Star rating, 1 to 5.
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub payment_id: String,
    /// Amount in minor currency units (cents).
    pub amount_cents: i64,
    /// ISO 4217 code, e.g. `"EUR"`.
    pub currency: String,
    pub status: PaymentStatus,
}

/// Free-form key/value payload for system and marketing notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeFormData {
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Payload attached to a notification, tagged by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationData {
    System(FreeFormData),
    Message(MessageData),
    Reservation(ReservationData),
    Review(ReviewData),
    Payment(PaymentData),
    Marketing(FreeFormData),
}

impl NotificationData {
    /// The category this payload belongs to.
    pub fn notification_type(&self) -> NotificationType {
        match self {
            NotificationData::System(_) => NotificationType::System,
            NotificationData::Message(_) => NotificationType::Message,
            NotificationData::Reservation(_) => NotificationType::Reservation,
            NotificationData::Review(_) => NotificationType::Review,
            NotificationData::Payment(_) => NotificationType::Payment,
            NotificationData::Marketing(_) => NotificationType::Marketing,
        }
    }

    /// Flatten the payload into string pairs, as FCM `data` and email
    /// templates require.
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        match self {
            NotificationData::System(d) | NotificationData::Marketing(d) => {
                map.extend(d.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            NotificationData::Message(d) => {
                map.insert("senderId".into(), d.sender_id.clone());
                map.insert("senderName".into(), d.sender_name.clone());
                map.insert("conversationId".into(), d.conversation_id.clone());
                if let Some(avatar) = &d.sender_avatar {
                    map.insert("senderAvatar".into(), avatar.clone());
                }
            }
            NotificationData::Reservation(d) => {
                map.insert("reservationId".into(), d.reservation_id.clone());
                map.insert("listingTitle".into(), d.listing_title.clone());
                map.insert("checkIn".into(), d.check_in.to_string());
                map.insert("checkOut".into(), d.check_out.to_string());
                map.insert("status".into(), d.status.as_str().into());
            }
            NotificationData::Review(d) => {
                map.insert("reviewId".into(), d.review_id.clone());
                map.insert("reviewerName".into(), d.reviewer_name.clone());
                map.insert("rating".into(), d.rating.to_string());
                if let Some(title) = &d.listing_title {
                    map.insert("listingTitle".into(), title.clone());
                }
            }
            NotificationData::Payment(d) => {
                map.insert("paymentId".into(), d.payment_id.clone());
                map.insert("amount".into(), format_amount(d.amount_cents));
                map.insert("currency".into(), d.currency.clone());
                map.insert("status".into(), d.status.as_str().into());
            }
        }
        map
    }
}

/// Render minor units as a decimal string, e.g. `12345` -> `"123.45"`.
pub fn format_amount(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject a blank recipient.
pub fn validate_recipient(user_id: &str) -> Result<(), CoreError> {
    if user_id.trim().is_empty() {
        return Err(CoreError::Validation("user_id must not be empty".into()));
    }
    Ok(())
}

/// Validate the content of a notification before it is persisted.
///
/// Checks title/message bounds, that the payload variant matches `ty`, and the
/// per-variant field constraints.
pub fn validate_content(
    ty: NotificationType,
    title: &str,
    message: &str,
    data: &NotificationData,
) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(CoreError::Validation(format!(
            "message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }

    let data_type = data.notification_type();
    if data_type != ty {
        return Err(CoreError::Validation(format!(
            "payload of kind '{}' does not match notification type '{}'",
            data_type.as_str(),
            ty.as_str()
        )));
    }

    match data {
        NotificationData::Review(d) if !(1..=5).contains(&d.rating) => Err(
            CoreError::Validation(format!("rating must be between 1 and 5, got {}", d.rating)),
        ),
        NotificationData::Reservation(d) if d.check_out < d.check_in => Err(
            CoreError::Validation("check_out must not be before check_in".into()),
        ),
        NotificationData::Payment(d) if d.amount_cents < 0 => {
            Err(CoreError::Validation("amount_cents must not be negative".into()))
        }
        NotificationData::Payment(d)
            if d.currency.len() != 3 || !d.currency.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            Err(CoreError::Validation(format!(
                "currency must be a 3-letter ISO code, got '{}'",
                d.currency
            )))
        }
        _ => Ok(()),
    }
}
