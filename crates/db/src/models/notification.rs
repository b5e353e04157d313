//! Notification record models and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use voyage_core::analytics::DailyTypeCounts;
use voyage_core::notification::{NotificationData, NotificationType};
use voyage_core::types::{NotificationId, Timestamp, UserId};

use crate::error::StoreError;

/// A stored notification.
///
/// `id` never changes and `is_read` only moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub clicked_at: Option<Timestamp>,
    /// Whether in-app surfaces (list, badge) show this record.
    pub in_app_visible: bool,
    pub created_at: Timestamp,
}

/// DTO for creating a notification. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub in_app_visible: bool,
}

/// A row from the `notifications` table.
#[derive(Debug, FromRow)]
pub struct NotificationRow {
    pub id: NotificationId,
    pub user_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub data: Json<NotificationData>,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub clicked_at: Option<Timestamp>,
    pub in_app_visible: bool,
    pub created_at: Timestamp,
}

/// One `GROUP BY day, notification_type` row of the analytics query.
#[derive(Debug, FromRow)]
pub struct DailyCountRow {
    pub day: NaiveDate,
    pub notification_type: String,
    pub sent: i64,
    pub read_count: i64,
    pub clicked_count: i64,
}

impl TryFrom<DailyCountRow> for DailyTypeCounts {
    type Error = StoreError;

    fn try_from(row: DailyCountRow) -> Result<Self, Self::Error> {
        let notification_type = NotificationType::parse(&row.notification_type)
            .map_err(|e| StoreError::Corrupt(format!("daily counts for {}: {e}", row.day)))?;
        Ok(DailyTypeCounts {
            date: row.day,
            notification_type,
            sent: count(row.sent),
            read: count(row.read_count),
            clicked: count(row.clicked_count),
        })
    }
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

impl TryFrom<NotificationRow> for NotificationRecord {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let notification_type = NotificationType::parse(&row.notification_type)
            .map_err(|e| StoreError::Corrupt(format!("notification {}: {e}", row.id)))?;
        Ok(NotificationRecord {
            id: row.id,
            user_id: row.user_id,
            notification_type,
            title: row.title,
            message: row.message,
            data: row.data.0,
            is_read: row.is_read,
            read_at: row.read_at,
            clicked_at: row.clicked_at,
            in_app_visible: row.in_app_visible,
            created_at: row.created_at,
        })
    }
}
