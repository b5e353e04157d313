//! PostgreSQL store adapter.
//!
//! Thin glue between the store traits and the repositories: rows are decoded
//! into domain models and missing rows are mapped to `NotFound`.

use async_trait::async_trait;
use voyage_core::analytics::{DailyTypeCounts, DeliveryTotals};
use voyage_core::error::CoreError;
use voyage_core::filter::{DateRange, NotificationFilter};
use voyage_core::notification::Platform;
use voyage_core::preferences::{
    EmailPreferences, EmailPreferencesUpdate, NotificationSettings, SettingsUpdate,
};
use voyage_core::types::{NotificationId, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::models::delivery::{DeliveryOutcome, NewDeliveryOutcome};
use crate::models::device_token::DeviceToken;
use crate::models::notification::{NewNotification, NotificationRecord};
use crate::repositories::{DeliveryOutcomeRepo, DeviceTokenRepo, NotificationRepo, PreferenceRepo};
use crate::store::{DeliveryLogStore, DeviceTokenStore, NotificationStore, PreferenceStore};
use crate::DbPool;

/// Store adapter over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn create(&self, new: NewNotification) -> StoreResult<NotificationRecord> {
        NotificationRepo::create(&self.pool, &new).await?.try_into()
    }

    async fn get(&self, id: NotificationId) -> StoreResult<Option<NotificationRecord>> {
        NotificationRepo::find_by_id(&self.pool, id)
            .await?
            .map(NotificationRecord::try_from)
            .transpose()
    }

    async fn list(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> StoreResult<Vec<NotificationRecord>> {
        filter.validate()?;
        decode_all(NotificationRepo::list_for_user(&self.pool, user_id, filter).await?)
    }

    async fn unread_count(&self, user_id: &str) -> StoreResult<i64> {
        Ok(NotificationRepo::unread_count(&self.pool, user_id).await?)
    }

    async fn mark_read(&self, id: NotificationId) -> StoreResult<NotificationRecord> {
        NotificationRepo::mark_read(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::notification_not_found(id))?
            .try_into()
    }

    async fn mark_clicked(&self, id: NotificationId) -> StoreResult<NotificationRecord> {
        NotificationRepo::mark_clicked(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::notification_not_found(id))?
            .try_into()
    }

    async fn mark_all_read(&self, user_id: &str) -> StoreResult<u64> {
        Ok(NotificationRepo::mark_all_read(&self.pool, user_id).await?)
    }

    async fn delete(&self, id: NotificationId) -> StoreResult<bool> {
        Ok(NotificationRepo::delete(&self.pool, id).await?)
    }

    async fn daily_counts(
        &self,
        range: DateRange,
        user_id: Option<&str>,
    ) -> StoreResult<Vec<DailyTypeCounts>> {
        decode_all(NotificationRepo::daily_counts(&self.pool, range, user_id).await?)
    }

    async fn delete_older_than(&self, cutoff: Timestamp) -> StoreResult<u64> {
        Ok(NotificationRepo::delete_older_than(&self.pool, cutoff).await?)
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn get_settings(&self, user_id: &str) -> StoreResult<Option<NotificationSettings>> {
        Ok(PreferenceRepo::get_settings(&self.pool, user_id).await?)
    }

    async fn merge_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> StoreResult<NotificationSettings> {
        Ok(PreferenceRepo::merge_settings(&self.pool, user_id, update).await?)
    }

    async fn delete_settings(&self, user_id: &str) -> StoreResult<()> {
        Ok(PreferenceRepo::delete_settings(&self.pool, user_id).await?)
    }

    async fn get_email_preferences(&self, user_id: &str) -> StoreResult<Option<EmailPreferences>> {
        Ok(PreferenceRepo::get_email_preferences(&self.pool, user_id).await?)
    }

    async fn merge_email_preferences(
        &self,
        user_id: &str,
        update: &EmailPreferencesUpdate,
    ) -> StoreResult<EmailPreferences> {
        Ok(PreferenceRepo::merge_email_preferences(&self.pool, user_id, update).await?)
    }
}

#[async_trait]
impl DeviceTokenStore for PgStore {
    async fn register(
        &self,
        user_id: &str,
        token: &str,
        platform: Platform,
    ) -> StoreResult<DeviceToken> {
        DeviceTokenRepo::upsert(&self.pool, user_id, token, platform)
            .await?
            .try_into()
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<DeviceToken>> {
        decode_all(DeviceTokenRepo::list_for_user(&self.pool, user_id).await?)
    }

    async fn list_platforms(&self, user_id: Option<&str>) -> StoreResult<Vec<Platform>> {
        DeviceTokenRepo::list_platforms(&self.pool, user_id)
            .await?
            .iter()
            .map(|p| Platform::parse(p).map_err(|e| StoreError::Corrupt(e.to_string())))
            .collect()
    }

    async fn unregister(&self, user_id: &str, token: &str) -> StoreResult<bool> {
        Ok(DeviceTokenRepo::delete(&self.pool, user_id, token).await?)
    }
}

#[async_trait]
impl DeliveryLogStore for PgStore {
    async fn record(&self, outcome: NewDeliveryOutcome) -> StoreResult<DeliveryOutcome> {
        DeliveryOutcomeRepo::create(&self.pool, &outcome)
            .await?
            .try_into()
    }

    async fn list_for_notification(
        &self,
        notification_id: NotificationId,
    ) -> StoreResult<Vec<DeliveryOutcome>> {
        decode_all(DeliveryOutcomeRepo::list_for_notification(&self.pool, notification_id).await?)
    }

    async fn totals(&self, range: DateRange, user_id: Option<&str>) -> StoreResult<DeliveryTotals> {
        let (attempts, delivered) = DeliveryOutcomeRepo::totals(&self.pool, range, user_id).await?;
        Ok(DeliveryTotals {
            attempts: u64::try_from(attempts).unwrap_or(0),
            delivered: u64::try_from(delivered).unwrap_or(0),
        })
    }
}
