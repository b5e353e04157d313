//! Layered notification preferences and channel eligibility.
//!
//! Eligibility for a channel is `!mute_all && master[channel] &&
//! categories[type][channel]`. Everything here is pure and lock-free so the
//! dispatcher can evaluate it from concurrent fan-outs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channels::Channel;
use crate::notification::NotificationType;

// ---------------------------------------------------------------------------
// CategoryChannels
// ---------------------------------------------------------------------------

/// Per-category channel toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChannels {
    pub push: bool,
    pub email: bool,
    pub in_app: bool,
}

impl CategoryChannels {
    /// System defaults: everything on, except push for marketing.
    pub fn default_for(ty: NotificationType) -> Self {
        Self {
            push: ty != NotificationType::Marketing,
            email: true,
            in_app: true,
        }
    }

    pub fn allows(&self, channel: Channel) -> bool {
        match channel {
            Channel::Push => self.push,
            Channel::Email => self.email,
            Channel::InApp => self.in_app,
        }
    }

    fn apply(&mut self, update: &CategoryChannelsUpdate) {
        if let Some(v) = update.push {
            self.push = v;
        }
        if let Some(v) = update.email {
            self.email = v;
        }
        if let Some(v) = update.in_app {
            self.in_app = v;
        }
    }
}

/// Partial update for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChannelsUpdate {
    pub push: Option<bool>,
    pub email: Option<bool>,
    pub in_app: Option<bool>,
}

// ---------------------------------------------------------------------------
// NotificationSettings
// ---------------------------------------------------------------------------

/// A user's notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub enable_push: bool,
    pub enable_email: bool,
    pub enable_in_app: bool,
    /// Global override that silences every channel.
    pub mute_all: bool,
    pub categories: BTreeMap<NotificationType, CategoryChannels>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enable_push: true,
            enable_email: true,
            enable_in_app: true,
            mute_all: false,
            categories: NotificationType::ALL
                .into_iter()
                .map(|ty| (ty, CategoryChannels::default_for(ty)))
                .collect(),
        }
    }
}

impl NotificationSettings {
    /// Channel toggles for a category, falling back to the system default
    /// when the category is absent (e.g. settings persisted before it existed).
    pub fn category(&self, ty: NotificationType) -> CategoryChannels {
        self.categories
            .get(&ty)
            .copied()
            .unwrap_or_else(|| CategoryChannels::default_for(ty))
    }

    fn master_switch(&self, channel: Channel) -> bool {
        match channel {
            Channel::Push => self.enable_push,
            Channel::Email => self.enable_email,
            Channel::InApp => self.enable_in_app,
        }
    }

    /// Merge a partial update: field-wise for the switches, key-wise for
    /// categories. Unspecified categories keep their prior values.
    pub fn merged(&self, update: &SettingsUpdate) -> Self {
        let mut next = self.clone();
        if let Some(v) = update.enable_push {
            next.enable_push = v;
        }
        if let Some(v) = update.enable_email {
            next.enable_email = v;
        }
        if let Some(v) = update.enable_in_app {
            next.enable_in_app = v;
        }
        if let Some(v) = update.mute_all {
            next.mute_all = v;
        }
        if let Some(categories) = &update.categories {
            for (ty, patch) in categories {
                let mut current = next.category(*ty);
                current.apply(patch);
                next.categories.insert(*ty, current);
            }
        }
        next
    }
}

/// Partial settings update as sent by the settings form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub enable_push: Option<bool>,
    pub enable_email: Option<bool>,
    pub enable_in_app: Option<bool>,
    pub mute_all: Option<bool>,
    pub categories: Option<BTreeMap<NotificationType, CategoryChannelsUpdate>>,
}

/// Whether `channel` may deliver a notification of type `ty` under `settings`.
pub fn is_eligible(settings: &NotificationSettings, ty: NotificationType, channel: Channel) -> bool {
    !settings.mute_all && settings.master_switch(channel) && settings.category(ty).allows(channel)
}

// ---------------------------------------------------------------------------
// EmailPreferences
// ---------------------------------------------------------------------------

/// Per-user email opt-ins and the address mail is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPreferences {
    pub address: Option<String>,
    pub categories: BTreeMap<NotificationType, bool>,
}

impl Default for EmailPreferences {
    fn default() -> Self {
        Self {
            address: None,
            categories: NotificationType::ALL
                .into_iter()
                .map(|ty| (ty, ty != NotificationType::Marketing))
                .collect(),
        }
    }
}

impl EmailPreferences {
    pub fn opted_in(&self, ty: NotificationType) -> bool {
        self.categories
            .get(&ty)
            .copied()
            .unwrap_or(ty != NotificationType::Marketing)
    }

    /// Merge a partial update key-wise, like [`NotificationSettings::merged`].
    pub fn merged(&self, update: &EmailPreferencesUpdate) -> Self {
        let mut next = self.clone();
        if let Some(address) = &update.address {
            let trimmed = address.trim();
            next.address = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(categories) = &update.categories {
            next.categories
                .extend(categories.iter().map(|(ty, on)| (*ty, *on)));
        }
        next
    }
}

/// Partial email preference update. An empty `address` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPreferencesUpdate {
    pub address: Option<String>,
    pub categories: Option<BTreeMap<NotificationType, bool>>,
}
