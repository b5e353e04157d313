//! Settings access for the dispatcher and the settings API.
//!
//! The eligibility rule itself is the pure
//! [`voyage_core::preferences::is_eligible`]; this service only loads and
//! stores the per-user documents it evaluates.

use std::sync::Arc;

use voyage_core::channels::Channel;
use voyage_core::notification::NotificationType;
use voyage_core::preferences::{self, NotificationSettings, SettingsUpdate};
use voyage_db::{PreferenceStore, StoreResult};

/// Loads, merges and resets per-user notification settings.
#[derive(Clone)]
pub struct PreferenceResolver {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceResolver {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Stored settings, or the system defaults for a user who never saved any.
    pub async fn get_settings(&self, user_id: &str) -> StoreResult<NotificationSettings> {
        Ok(self.store.get_settings(user_id).await?.unwrap_or_default())
    }

    /// Apply a partial update and return the merged settings.
    pub async fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> StoreResult<NotificationSettings> {
        let merged = self.store.merge_settings(user_id, update).await?;
        tracing::debug!(user_id, mute_all = merged.mute_all, "Notification settings updated");
        Ok(merged)
    }

    /// Forget stored settings so the user is back on the defaults.
    pub async fn reset_settings(&self, user_id: &str) -> StoreResult<NotificationSettings> {
        self.store.delete_settings(user_id).await?;
        tracing::debug!(user_id, "Notification settings reset");
        Ok(NotificationSettings::default())
    }

    pub fn is_eligible(
        settings: &NotificationSettings,
        ty: NotificationType,
        channel: Channel,
    ) -> bool {
        preferences::is_eligible(settings, ty, channel)
    }
}
