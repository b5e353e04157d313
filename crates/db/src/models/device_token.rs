//! Push device token models.

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use voyage_core::notification::Platform;
use voyage_core::types::{Timestamp, UserId};

use crate::error::StoreError;

/// A registered push device. A user may own many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub token: String,
    pub platform: Platform,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
}

/// A row from the `device_tokens` table.
#[derive(Debug, FromRow)]
pub struct DeviceTokenRow {
    pub id: Uuid,
    pub user_id: String,
    pub token: String,
    pub platform: String,
    pub created_at: Timestamp,
    pub last_used_at: Timestamp,
}

impl TryFrom<DeviceTokenRow> for DeviceToken {
    type Error = StoreError;

    fn try_from(row: DeviceTokenRow) -> Result<Self, Self::Error> {
        let platform = Platform::parse(&row.platform)
            .map_err(|e| StoreError::Corrupt(format!("device token {}: {e}", row.id)))?;
        Ok(DeviceToken {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            platform,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        })
    }
}
