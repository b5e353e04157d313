//! Channel delivery outcome models.

use serde::Serialize;
use sqlx::FromRow;
use voyage_core::channels::Channel;
use voyage_core::notification::NotificationType;
use voyage_core::types::{NotificationId, Timestamp, UserId};

use crate::error::StoreError;

/// Result of one external channel attempt for one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub id: i64,
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub channel: Channel,
    pub delivered: bool,
    pub device_count: i32,
    pub error: Option<String>,
    pub recorded_at: Timestamp,
}

/// DTO for recording an outcome.
#[derive(Debug, Clone)]
pub struct NewDeliveryOutcome {
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub channel: Channel,
    pub delivered: bool,
    pub device_count: i32,
    pub error: Option<String>,
}

/// A row from the `delivery_outcomes` table.
#[derive(Debug, FromRow)]
pub struct DeliveryOutcomeRow {
    pub id: i64,
    pub notification_id: NotificationId,
    pub user_id: String,
    pub notification_type: String,
    pub channel: String,
    pub delivered: bool,
    pub device_count: i32,
    pub error: Option<String>,
    pub recorded_at: Timestamp,
}

impl TryFrom<DeliveryOutcomeRow> for DeliveryOutcome {
    type Error = StoreError;

    fn try_from(row: DeliveryOutcomeRow) -> Result<Self, Self::Error> {
        let notification_type = NotificationType::parse(&row.notification_type)
            .map_err(|e| StoreError::Corrupt(format!("delivery outcome {}: {e}", row.id)))?;
        let channel = Channel::parse(&row.channel).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "delivery outcome {}: unknown channel '{}'",
                row.id, row.channel
            ))
        })?;
        Ok(DeliveryOutcome {
            id: row.id,
            notification_id: row.notification_id,
            user_id: row.user_id,
            notification_type,
            channel,
            delivered: row.delivered,
            device_count: row.device_count,
            error: row.error,
            recorded_at: row.recorded_at,
        })
    }
}
