//! Notification dispatch: persist, resolve channels, fan out.
//!
//! The record is always written first; external channels run afterwards,
//! concurrently, each under its own timeout. Channel failures end up in the
//! delivery log and the logs, never in the caller's result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use voyage_core::channels::Channel;
use voyage_core::notification::{
    validate_content, validate_recipient, NotificationData, NotificationType,
};
use voyage_core::preferences::NotificationSettings;
use voyage_db::models::delivery::NewDeliveryOutcome;
use voyage_db::models::notification::{NewNotification, NotificationRecord};
use voyage_db::{DeliveryLogStore, NotificationStore, StoreResult};

use crate::delivery::email::EmailGateway;
use crate::delivery::push::{PushGateway, PushNotification};
use crate::preferences::PreferenceResolver;

/// Default per-channel send timeout.
pub const DEFAULT_CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);

/// What a producer asks to be delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub data: NotificationData,
}

/// Result of one external channel attempt, before it is logged.
struct ChannelAttempt {
    channel: Channel,
    delivered: bool,
    device_count: i32,
    error: Option<String>,
}

impl ChannelAttempt {
    fn failed(channel: Channel, error: impl ToString) -> Self {
        Self {
            channel,
            delivered: false,
            device_count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Orchestrates persistence and channel fan-out for one notification.
pub struct DeliveryDispatcher {
    notifications: Arc<dyn NotificationStore>,
    deliveries: Arc<dyn DeliveryLogStore>,
    preferences: PreferenceResolver,
    push: Arc<PushGateway>,
    email: Arc<EmailGateway>,
    channel_timeout: Duration,
}

impl DeliveryDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        deliveries: Arc<dyn DeliveryLogStore>,
        preferences: PreferenceResolver,
        push: Arc<PushGateway>,
        email: Arc<EmailGateway>,
    ) -> Self {
        Self {
            notifications,
            deliveries,
            preferences,
            push,
            email,
            channel_timeout: DEFAULT_CHANNEL_TIMEOUT,
        }
    }

    pub fn with_channel_timeout(mut self, timeout: Duration) -> Self {
        self.channel_timeout = timeout;
        self
    }

    /// Deliver one notification.
    ///
    /// Fails only on an invalid request or when the record cannot be
    /// persisted. If settings cannot be loaded the defaults apply. Push and
    /// email outcomes are recorded in the delivery log.
    pub async fn dispatch(&self, request: DispatchRequest) -> StoreResult<NotificationRecord> {
        validate_recipient(&request.user_id)?;
        validate_content(
            request.notification_type,
            &request.title,
            &request.message,
            &request.data,
        )?;

        let settings = match self.preferences.get_settings(&request.user_id).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(
                    user_id = %request.user_id,
                    error = %e,
                    "Settings lookup failed, dispatching with defaults"
                );
                NotificationSettings::default()
            }
        };
        let ty = request.notification_type;

        let record = self
            .notifications
            .create(NewNotification {
                user_id: request.user_id,
                notification_type: ty,
                title: request.title,
                message: request.message,
                data: request.data,
                in_app_visible: PreferenceResolver::is_eligible(&settings, ty, Channel::InApp),
            })
            .await?;

        tracing::info!(
            notification_id = %record.id,
            user_id = %record.user_id,
            notification_type = ty.as_str(),
            in_app_visible = record.in_app_visible,
            "Notification stored"
        );

        self.fan_out(&record, &settings).await;
        Ok(record)
    }

    async fn fan_out(&self, record: &NotificationRecord, settings: &NotificationSettings) {
        let ty = record.notification_type;
        let push = async {
            if PreferenceResolver::is_eligible(settings, ty, Channel::Push) {
                Some(self.deliver_push(record).await)
            } else {
                None
            }
        };
        let email = async {
            if PreferenceResolver::is_eligible(settings, ty, Channel::Email) {
                self.deliver_email(record).await
            } else {
                None
            }
        };

        let (push, email) = tokio::join!(push, email);
        for attempt in push.into_iter().chain(email) {
            self.record_outcome(record, attempt).await;
        }
    }

    async fn deliver_push(&self, record: &NotificationRecord) -> ChannelAttempt {
        let mut notification = PushNotification::new(&record.title, &record.message, &record.data)
            .with_notification_id(record.id);
        match self.notifications.unread_count(&record.user_id).await {
            Ok(unread) => notification = notification.with_badge(unread),
            Err(e) => {
                tracing::warn!(user_id = %record.user_id, error = %e, "Badge count unavailable")
            }
        }

        let send = self.push.send(&record.user_id, &notification);
        match tokio::time::timeout(self.channel_timeout, send).await {
            Ok(Ok(outcome)) => ChannelAttempt {
                channel: Channel::Push,
                delivered: outcome.delivered,
                device_count: i32::try_from(outcome.device_count).unwrap_or(i32::MAX),
                error: outcome.error,
            },
            Ok(Err(e)) => ChannelAttempt::failed(Channel::Push, e),
            Err(_) => ChannelAttempt::failed(
                Channel::Push,
                format!("push timed out after {:?}", self.channel_timeout),
            ),
        }
    }

    /// `None` when the user has opted out of email for this type.
    async fn deliver_email(&self, record: &NotificationRecord) -> Option<ChannelAttempt> {
        let ty = record.notification_type;
        let prefs = match self.email.get_preferences(&record.user_id).await {
            Ok(prefs) => prefs,
            Err(e) => return Some(ChannelAttempt::failed(Channel::Email, e)),
        };
        if !prefs.opted_in(ty) {
            return None;
        }

        let template_id = match self.email.template_for(ty) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(notification_type = ty.as_str(), error = %e, "Email template missing");
                return Some(ChannelAttempt::failed(Channel::Email, e));
            }
        };

        let vars = template_vars(record);
        let send = self.email.send_templated(&record.user_id, template_id, &vars);
        let attempt = match tokio::time::timeout(self.channel_timeout, send).await {
            Ok(Ok(delivered)) => ChannelAttempt {
                channel: Channel::Email,
                delivered,
                device_count: 0,
                error: None,
            },
            Ok(Err(e)) => ChannelAttempt::failed(Channel::Email, e),
            Err(_) => ChannelAttempt::failed(
                Channel::Email,
                format!("email timed out after {:?}", self.channel_timeout),
            ),
        };
        Some(attempt)
    }

    async fn record_outcome(&self, record: &NotificationRecord, attempt: ChannelAttempt) {
        if let Some(error) = &attempt.error {
            if !attempt.delivered {
                tracing::warn!(
                    notification_id = %record.id,
                    user_id = %record.user_id,
                    channel = attempt.channel.as_str(),
                    error = %error,
                    "Channel delivery failed"
                );
            }
        }

        let outcome = NewDeliveryOutcome {
            notification_id: record.id,
            user_id: record.user_id.clone(),
            notification_type: record.notification_type,
            channel: attempt.channel,
            delivered: attempt.delivered,
            device_count: attempt.device_count,
            error: attempt.error,
        };
        if let Err(e) = self.deliveries.record(outcome).await {
            tracing::error!(
                notification_id = %record.id,
                error = %e,
                "Failed to record delivery outcome"
            );
        }
    }
}

/// Placeholder values for email templates: the flattened payload plus the
/// record's own title and message.
fn template_vars(record: &NotificationRecord) -> BTreeMap<String, String> {
    let mut vars = record.data.to_string_map();
    vars.insert("title".into(), record.title.clone());
    vars.insert("message".into(), record.message.clone());
    vars
}
