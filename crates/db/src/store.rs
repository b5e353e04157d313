//! Store interfaces.
//!
//! The engine talks to persistence only through these traits. Two adapters
//! exist: [`MemoryStore`](crate::memory::MemoryStore) and
//! [`PgStore`](crate::postgres::PgStore). [`Stores`] bundles one of them for
//! injection at process start.

use std::sync::Arc;

use async_trait::async_trait;
use voyage_core::analytics::{DailyTypeCounts, DeliveryTotals};
use voyage_core::filter::{DateRange, NotificationFilter};
use voyage_core::notification::Platform;
use voyage_core::preferences::{
    EmailPreferences, EmailPreferencesUpdate, NotificationSettings, SettingsUpdate,
};
use voyage_core::types::{NotificationId, Timestamp};

use crate::error::StoreResult;
use crate::memory::MemoryStore;
use crate::models::delivery::{DeliveryOutcome, NewDeliveryOutcome};
use crate::models::device_token::DeviceToken;
use crate::models::notification::{NewNotification, NotificationRecord};
use crate::postgres::PgStore;
use crate::DbPool;

/// Notification records: CRUD plus filtering.
///
/// Mutations are atomic per record (`mark_read`, `delete`) or per user
/// (`mark_all_read`): a record created concurrently with `mark_all_read` is
/// never swept up by it.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Persist a notification, assigning its id and `created_at`.
    async fn create(&self, new: NewNotification) -> StoreResult<NotificationRecord>;

    async fn get(&self, id: NotificationId) -> StoreResult<Option<NotificationRecord>>;

    /// Visible records for `user_id` matching `filter`, newest first.
    async fn list(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> StoreResult<Vec<NotificationRecord>>;

    /// Number of visible unread records for `user_id`.
    async fn unread_count(&self, user_id: &str) -> StoreResult<i64>;

    /// Mark one record read. Idempotent; missing ids fail with `NotFound`.
    async fn mark_read(&self, id: NotificationId) -> StoreResult<NotificationRecord>;

    /// Record the first click on a notification, which also marks it read.
    async fn mark_clicked(&self, id: NotificationId) -> StoreResult<NotificationRecord>;

    /// Mark every visible unread record of `user_id` read, returning how many
    /// transitioned.
    async fn mark_all_read(&self, user_id: &str) -> StoreResult<u64>;

    /// Delete a record. Returns `false` when it did not exist.
    async fn delete(&self, id: NotificationId) -> StoreResult<bool>;

    /// Sent/read/clicked counts per UTC day and category for records created
    /// within `range`, optionally for one user. Hidden records count too.
    async fn daily_counts(
        &self,
        range: DateRange,
        user_id: Option<&str>,
    ) -> StoreResult<Vec<DailyTypeCounts>>;

    /// Retention: delete records created before `cutoff`.
    async fn delete_older_than(&self, cutoff: Timestamp) -> StoreResult<u64>;
}

/// Per-user notification settings and email preferences.
///
/// `None` means nothing has been stored yet; callers substitute defaults.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_settings(&self, user_id: &str) -> StoreResult<Option<NotificationSettings>>;

    /// Atomically merge `update` into the stored (or default) settings.
    async fn merge_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> StoreResult<NotificationSettings>;

    /// Drop stored settings so the user falls back to defaults.
    async fn delete_settings(&self, user_id: &str) -> StoreResult<()>;

    async fn get_email_preferences(&self, user_id: &str) -> StoreResult<Option<EmailPreferences>>;

    /// Atomically merge `update` into the stored (or default) email preferences.
    async fn merge_email_preferences(
        &self,
        user_id: &str,
        update: &EmailPreferencesUpdate,
    ) -> StoreResult<EmailPreferences>;
}

/// Push device registrations.
#[async_trait]
pub trait DeviceTokenStore: Send + Sync {
    /// Upsert keyed by `(user_id, token)`; re-registering refreshes `last_used_at`.
    async fn register(
        &self,
        user_id: &str,
        token: &str,
        platform: Platform,
    ) -> StoreResult<DeviceToken>;

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<DeviceToken>>;

    /// Platforms of every registered device, optionally for one user.
    async fn list_platforms(&self, user_id: Option<&str>) -> StoreResult<Vec<Platform>>;

    /// Remove a registration. Returns `false` when it did not exist.
    async fn unregister(&self, user_id: &str, token: &str) -> StoreResult<bool>;
}

/// Append-only log of channel delivery outcomes.
#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    async fn record(&self, outcome: NewDeliveryOutcome) -> StoreResult<DeliveryOutcome>;

    /// Outcomes for one notification, in the order they were recorded.
    async fn list_for_notification(
        &self,
        notification_id: NotificationId,
    ) -> StoreResult<Vec<DeliveryOutcome>>;

    /// Attempt and success counts for outcomes recorded within `range`.
    async fn totals(&self, range: DateRange, user_id: Option<&str>) -> StoreResult<DeliveryTotals>;
}

/// The store adapters selected at process start.
#[derive(Clone)]
pub struct Stores {
    pub notifications: Arc<dyn NotificationStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub devices: Arc<dyn DeviceTokenStore>,
    pub deliveries: Arc<dyn DeliveryLogStore>,
}

impl Stores {
    /// Volatile stores backed by process memory.
    pub fn in_memory() -> Self {
        Self::from_adapter(Arc::new(MemoryStore::new()))
    }

    /// Durable stores backed by PostgreSQL.
    pub fn postgres(pool: DbPool) -> Self {
        Self::from_adapter(Arc::new(PgStore::new(pool)))
    }

    fn from_adapter<S>(adapter: Arc<S>) -> Self
    where
        S: NotificationStore + PreferenceStore + DeviceTokenStore + DeliveryLogStore + 'static,
    {
        Self {
            notifications: adapter.clone(),
            preferences: adapter.clone(),
            devices: adapter.clone(),
            deliveries: adapter,
        }
    }
}
