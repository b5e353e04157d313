//! Repository for the `device_tokens` table.

use sqlx::PgPool;
use uuid::Uuid;
use voyage_core::notification::Platform;

use crate::models::device_token::DeviceTokenRow;

/// Column list for `device_tokens` queries.
const COLUMNS: &str = "id, user_id, token, platform, created_at, last_used_at";

/// Provides CRUD operations for push device registrations.
pub struct DeviceTokenRepo;

impl DeviceTokenRepo {
    /// Register a device token.
    ///
    /// Uses `INSERT ... ON CONFLICT (user_id, token) DO UPDATE` so a repeat
    /// registration refreshes the platform and `last_used_at` in place.
    pub async fn upsert(
        pool: &PgPool,
        user_id: &str,
        token: &str,
        platform: Platform,
    ) -> Result<DeviceTokenRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO device_tokens (id, user_id, token, platform) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, token) DO UPDATE SET \
                platform = EXCLUDED.platform, \
                last_used_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeviceTokenRow>(&query)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(token)
            .bind(platform.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<DeviceTokenRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM device_tokens WHERE user_id = $1 ORDER BY created_at"
        );
        sqlx::query_as::<_, DeviceTokenRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Platform of every registered device, optionally for one user.
    pub async fn list_platforms(
        pool: &PgPool,
        user_id: Option<&str>,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT platform FROM device_tokens WHERE ($1::text IS NULL OR user_id = $1)",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Remove a registration. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, user_id: &str, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
