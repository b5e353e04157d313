//! In-memory store adapter.
//!
//! Each collection sits behind its own `RwLock`. Record timestamps are
//! assigned under the notifications write lock and kept strictly increasing,
//! so insertion order is `created_at` order even when the clock stalls.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;
use voyage_core::analytics::{DailyTypeCounts, DeliveryTotals};
use voyage_core::error::CoreError;
use voyage_core::filter::{DateRange, NotificationFilter};
use voyage_core::notification::Platform;
use voyage_core::preferences::{
    EmailPreferences, EmailPreferencesUpdate, NotificationSettings, SettingsUpdate,
};
use voyage_core::types::{NotificationId, Timestamp};

use crate::error::StoreResult;
use crate::models::delivery::{DeliveryOutcome, NewDeliveryOutcome};
use crate::models::device_token::DeviceToken;
use crate::models::notification::{NewNotification, NotificationRecord};
use crate::store::{DeliveryLogStore, DeviceTokenStore, NotificationStore, PreferenceStore};

#[derive(Default)]
struct NotificationTable {
    /// Ordered by `created_at` ascending.
    records: Vec<NotificationRecord>,
    last_created_at: Option<Timestamp>,
}

impl NotificationTable {
    fn next_timestamp(&mut self, now: Timestamp) -> Timestamp {
        let ts = match self.last_created_at {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(ts);
        ts
    }

    fn find_mut(&mut self, id: NotificationId) -> StoreResult<&mut NotificationRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CoreError::notification_not_found(id).into())
    }
}

/// Source of "now" for every timestamp the store assigns.
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Process-local store. Contents vanish with the process.
pub struct MemoryStore {
    clock: Clock,
    notifications: RwLock<NotificationTable>,
    settings: RwLock<HashMap<String, NotificationSettings>>,
    email_preferences: RwLock<HashMap<String, EmailPreferences>>,
    devices: RwLock<Vec<DeviceToken>>,
    deliveries: RwLock<Vec<DeliveryOutcome>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    /// A store that reads time from `clock` instead of the system clock.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            notifications: RwLock::default(),
            settings: RwLock::default(),
            email_preferences: RwLock::default(),
            devices: RwLock::default(),
            deliveries: RwLock::default(),
        }
    }

    fn now(&self) -> Timestamp {
        (self.clock)()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(&self, new: NewNotification) -> StoreResult<NotificationRecord> {
        let now = self.now();
        let mut table = self.notifications.write().await;
        let record = NotificationRecord {
            id: Uuid::now_v7(),
            user_id: new.user_id,
            notification_type: new.notification_type,
            title: new.title,
            message: new.message,
            data: new.data,
            is_read: false,
            read_at: None,
            clicked_at: None,
            in_app_visible: new.in_app_visible,
            created_at: table.next_timestamp(now),
        };
        table.records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: NotificationId) -> StoreResult<Option<NotificationRecord>> {
        let table = self.notifications.read().await;
        Ok(table.records.iter().find(|r| r.id == id).cloned())
    }

    async fn list(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
    ) -> StoreResult<Vec<NotificationRecord>> {
        filter.validate()?;
        let table = self.notifications.read().await;
        Ok(table
            .records
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id && r.in_app_visible)
            .filter(|r| filter.matches(r.notification_type, r.is_read, r.created_at))
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit().map_or(usize::MAX, |l| l as usize))
            .cloned()
            .collect())
    }

    async fn unread_count(&self, user_id: &str) -> StoreResult<i64> {
        let table = self.notifications.read().await;
        Ok(table
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.in_app_visible && !r.is_read)
            .count() as i64)
    }

    async fn mark_read(&self, id: NotificationId) -> StoreResult<NotificationRecord> {
        let mut table = self.notifications.write().await;
        let record = table.find_mut(id)?;
        if !record.is_read {
            record.is_read = true;
            record.read_at = Some(self.now());
        }
        Ok(record.clone())
    }

    async fn mark_clicked(&self, id: NotificationId) -> StoreResult<NotificationRecord> {
        let mut table = self.notifications.write().await;
        let now = self.now();
        let record = table.find_mut(id)?;
        if !record.is_read {
            record.is_read = true;
            record.read_at = Some(now);
        }
        record.clicked_at.get_or_insert(now);
        Ok(record.clone())
    }

    async fn mark_all_read(&self, user_id: &str) -> StoreResult<u64> {
        let now = self.now();
        let mut table = self.notifications.write().await;
        let mut count = 0;
        for record in table
            .records
            .iter_mut()
            .filter(|r| r.user_id == user_id && r.in_app_visible && !r.is_read)
        {
            record.is_read = true;
            record.read_at = Some(now);
            count += 1;
        }
        Ok(count)
    }

    async fn delete(&self, id: NotificationId) -> StoreResult<bool> {
        let mut table = self.notifications.write().await;
        match table.records.iter().position(|r| r.id == id) {
            Some(idx) => {
                table.records.remove(idx);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn daily_counts(
        &self,
        range: DateRange,
        user_id: Option<&str>,
    ) -> StoreResult<Vec<DailyTypeCounts>> {
        let table = self.notifications.read().await;
        let mut groups: BTreeMap<_, DailyTypeCounts> = BTreeMap::new();
        for r in table
            .records
            .iter()
            .filter(|r| range.contains(r.created_at))
            .filter(|r| user_id.map_or(true, |u| r.user_id == u))
        {
            let date = r.created_at.date_naive();
            let entry = groups
                .entry((date, r.notification_type))
                .or_insert(DailyTypeCounts {
                    date,
                    notification_type: r.notification_type,
                    sent: 0,
                    read: 0,
                    clicked: 0,
                });
            entry.sent += 1;
            entry.read += u64::from(r.is_read);
            entry.clicked += u64::from(r.clicked_at.is_some());
        }
        Ok(groups.into_values().collect())
    }

    async fn delete_older_than(&self, cutoff: Timestamp) -> StoreResult<u64> {
        let mut table = self.notifications.write().await;
        let before = table.records.len();
        table.records.retain(|r| r.created_at >= cutoff);
        Ok((before - table.records.len()) as u64)
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_settings(&self, user_id: &str) -> StoreResult<Option<NotificationSettings>> {
        Ok(self.settings.read().await.get(user_id).cloned())
    }

    async fn merge_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> StoreResult<NotificationSettings> {
        let mut settings = self.settings.write().await;
        let merged = settings
            .get(user_id)
            .cloned()
            .unwrap_or_default()
            .merged(update);
        settings.insert(user_id.to_string(), merged.clone());
        Ok(merged)
    }

    async fn delete_settings(&self, user_id: &str) -> StoreResult<()> {
        self.settings.write().await.remove(user_id);
        Ok(())
    }

    async fn get_email_preferences(&self, user_id: &str) -> StoreResult<Option<EmailPreferences>> {
        Ok(self.email_preferences.read().await.get(user_id).cloned())
    }

    async fn merge_email_preferences(
        &self,
        user_id: &str,
        update: &EmailPreferencesUpdate,
    ) -> StoreResult<EmailPreferences> {
        let mut prefs = self.email_preferences.write().await;
        let merged = prefs
            .get(user_id)
            .cloned()
            .unwrap_or_default()
            .merged(update);
        prefs.insert(user_id.to_string(), merged.clone());
        Ok(merged)
    }
}

#[async_trait]
impl DeviceTokenStore for MemoryStore {
    async fn register(
        &self,
        user_id: &str,
        token: &str,
        platform: Platform,
    ) -> StoreResult<DeviceToken> {
        let now = self.now();
        let mut devices = self.devices.write().await;
        if let Some(existing) = devices
            .iter_mut()
            .find(|d| d.user_id == user_id && d.token == token)
        {
            existing.platform = platform;
            existing.last_used_at = now;
            return Ok(existing.clone());
        }
        let device = DeviceToken {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            token: token.to_string(),
            platform,
            created_at: now,
            last_used_at: now,
        };
        devices.push(device.clone());
        Ok(device)
    }

    async fn list_for_user(&self, user_id: &str) -> StoreResult<Vec<DeviceToken>> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_platforms(&self, user_id: Option<&str>) -> StoreResult<Vec<Platform>> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .filter(|d| user_id.map_or(true, |u| d.user_id == u))
            .map(|d| d.platform)
            .collect())
    }

    async fn unregister(&self, user_id: &str, token: &str) -> StoreResult<bool> {
        let mut devices = self.devices.write().await;
        let before = devices.len();
        devices.retain(|d| !(d.user_id == user_id && d.token == token));
        Ok(devices.len() < before)
    }
}

#[async_trait]
impl DeliveryLogStore for MemoryStore {
    async fn record(&self, outcome: NewDeliveryOutcome) -> StoreResult<DeliveryOutcome> {
        let recorded_at = self.now();
        let mut deliveries = self.deliveries.write().await;
        let stored = DeliveryOutcome {
            id: deliveries.len() as i64 + 1,
            notification_id: outcome.notification_id,
            user_id: outcome.user_id,
            notification_type: outcome.notification_type,
            channel: outcome.channel,
            delivered: outcome.delivered,
            device_count: outcome.device_count,
            error: outcome.error,
            recorded_at,
        };
        deliveries.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_notification(
        &self,
        notification_id: NotificationId,
    ) -> StoreResult<Vec<DeliveryOutcome>> {
        let deliveries = self.deliveries.read().await;
        Ok(deliveries
            .iter()
            .filter(|d| d.notification_id == notification_id)
            .cloned()
            .collect())
    }

    async fn totals(&self, range: DateRange, user_id: Option<&str>) -> StoreResult<DeliveryTotals> {
        let deliveries = self.deliveries.read().await;
        Ok(deliveries
            .iter()
            .filter(|d| range.contains(d.recorded_at))
            .filter(|d| user_id.map_or(true, |u| d.user_id == u))
            .fold(DeliveryTotals::default(), |mut acc, d| {
                acc.attempts += 1;
                acc.delivered += u64::from(d.delivered);
                acc
            }))
    }
}
