//! Repository for the `notification_settings` and `email_preferences` tables.
//!
//! Both tables hold one JSONB document per user. Merges run in a transaction
//! that seeds the default document, locks the row, and writes the merged
//! value back, so concurrent partial updates never lose each other's fields.

use sqlx::types::Json;
use sqlx::PgPool;
use voyage_core::preferences::{
    EmailPreferences, EmailPreferencesUpdate, NotificationSettings, SettingsUpdate,
};

/// Provides read and merge operations for per-user preferences.
pub struct PreferenceRepo;

impl PreferenceRepo {
    pub async fn get_settings(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<NotificationSettings>, sqlx::Error> {
        let row: Option<Json<NotificationSettings>> =
            sqlx::query_scalar("SELECT settings FROM notification_settings WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|json| json.0))
    }

    /// Merge `update` into the stored settings under a row lock.
    pub async fn merge_settings(
        pool: &PgPool,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<NotificationSettings, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO notification_settings (user_id, settings) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(Json(NotificationSettings::default()))
        .execute(&mut *tx)
        .await?;

        let Json(current): Json<NotificationSettings> = sqlx::query_scalar(
            "SELECT settings FROM notification_settings WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let merged = current.merged(update);
        sqlx::query(
            "UPDATE notification_settings SET settings = $2, updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(Json(&merged))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(merged)
    }

    pub async fn delete_settings(pool: &PgPool, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM notification_settings WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn get_email_preferences(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<EmailPreferences>, sqlx::Error> {
        let row: Option<Json<EmailPreferences>> =
            sqlx::query_scalar("SELECT preferences FROM email_preferences WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|json| json.0))
    }

    /// Merge `update` into the stored email preferences under a row lock.
    pub async fn merge_email_preferences(
        pool: &PgPool,
        user_id: &str,
        update: &EmailPreferencesUpdate,
    ) -> Result<EmailPreferences, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO email_preferences (user_id, preferences) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(Json(EmailPreferences::default()))
        .execute(&mut *tx)
        .await?;

        let Json(current): Json<EmailPreferences> = sqlx::query_scalar(
            "SELECT preferences FROM email_preferences WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let merged = current.merged(update);
        sqlx::query(
            "UPDATE email_preferences SET preferences = $2, updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(Json(&merged))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(merged)
    }
}
