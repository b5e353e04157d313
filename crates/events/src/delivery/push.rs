//! Push delivery to registered devices.
//!
//! Android and web tokens go through FCM, iOS tokens through APNs. The wire
//! payloads are built here; a [`PushTransport`] only moves bytes, so tests
//! swap in a recording transport while [`HttpPushTransport`] talks to the
//! real services.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use voyage_core::error::CoreError;
use voyage_core::notification::{
    NotificationData, NotificationType, Platform, DATA_KEY_NOTIFICATION_TYPE,
};
use voyage_core::types::NotificationId;
use voyage_db::models::device_token::DeviceToken;
use voyage_db::{DeviceTokenStore, StoreError, StoreResult};

/// HTTP request timeout for a single device send.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest device token accepted at registration.
pub const MAX_TOKEN_LEN: usize = 4096;

/// Icon shown by FCM clients.
pub const DEFAULT_ICON: &str = "/icons/notification-192.png";

/// APNs sound name.
pub const DEFAULT_SOUND: &str = "default";

/// Key under which the record id is added to push data for click tracking.
pub const DATA_KEY_NOTIFICATION_ID: &str = "notificationId";

const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1/projects";
const APNS_PRODUCTION_HOST: &str = "https://api.push.apple.com";
const APNS_SANDBOX_HOST: &str = "https://api.sandbox.push.apple.com";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for push delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The underlying HTTP request failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The push service returned a non-2xx status code.
    #[error("Push service returned HTTP {0}")]
    HttpStatus(u16),

    /// Credentials for the platform's push service are missing.
    #[error("{0} transport is not configured")]
    NotConfigured(&'static str),

    #[error("Push send timed out after {0:?}")]
    Timeout(Duration),

    /// Device lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub click_action: String,
}

/// FCM message: `{notification, data, token}`.
///
/// This is the platform-neutral shape; [`fcm_v1_body`] maps it onto the
/// HTTP v1 request, where `icon` and `click_action` live in the per-platform
/// blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FcmMessage {
    pub notification: FcmNotification,
    pub data: BTreeMap<String, String>,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnsAlert {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aps {
    pub alert: ApnsAlert,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,
    pub sound: String,
    #[serde(rename = "content-available")]
    pub content_available: u8,
}

/// APNs message: `{aps, data, token}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnsMessage {
    pub aps: Aps,
    pub data: BTreeMap<String, String>,
    pub token: String,
}

/// A payload addressed to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PushMessage {
    Fcm(FcmMessage),
    Apns(ApnsMessage),
}

impl PushMessage {
    /// Build the payload shape the device's platform expects.
    pub fn build(platform: Platform, token: &str, notification: &PushNotification) -> Self {
        if platform.uses_apns() {
            PushMessage::Apns(ApnsMessage {
                aps: Aps {
                    alert: ApnsAlert {
                        title: notification.title.clone(),
                        body: notification.body.clone(),
                    },
                    badge: notification.badge,
                    sound: DEFAULT_SOUND.to_string(),
                    content_available: 1,
                },
                data: notification.data.clone(),
                token: token.to_string(),
            })
        } else {
            PushMessage::Fcm(FcmMessage {
                notification: FcmNotification {
                    title: notification.title.clone(),
                    body: notification.body.clone(),
                    icon: DEFAULT_ICON.to_string(),
                    click_action: notification.click_action.clone(),
                },
                data: notification.data.clone(),
                token: token.to_string(),
            })
        }
    }

    pub fn token(&self) -> &str {
        match self {
            PushMessage::Fcm(m) => &m.token,
            PushMessage::Apns(m) => &m.token,
        }
    }
}

/// Platform-neutral content pushed to every device of one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    pub notification_type: NotificationType,
    /// Flattened payload; FCM requires string values.
    pub data: BTreeMap<String, String>,
    pub click_action: String,
    pub badge: Option<i64>,
}

impl PushNotification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, data: &NotificationData) -> Self {
        let notification_type = data.notification_type();
        let mut flat = data.to_string_map();
        flat.insert(
            DATA_KEY_NOTIFICATION_TYPE.to_string(),
            notification_type.as_str().to_string(),
        );
        Self {
            title: title.into(),
            body: body.into(),
            notification_type,
            data: flat,
            click_action: click_action_for(data),
            badge: None,
        }
    }

    pub fn with_notification_id(mut self, id: NotificationId) -> Self {
        self.data
            .insert(DATA_KEY_NOTIFICATION_ID.to_string(), id.to_string());
        self
    }

    pub fn with_badge(mut self, badge: i64) -> Self {
        self.badge = Some(badge);
        self
    }
}

/// Client route opened when the notification is tapped.
pub fn click_action_for(data: &NotificationData) -> String {
    match data {
        NotificationData::Message(d) => format!("/messages/{}", d.conversation_id),
        NotificationData::Reservation(d) => format!("/reservations/{}", d.reservation_id),
        NotificationData::Review(d) => format!("/reviews/{}", d.review_id),
        NotificationData::Payment(d) => format!("/payments/{}", d.payment_id),
        NotificationData::System(_) | NotificationData::Marketing(_) => "/notifications".into(),
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// HTTP v1 `messages:send` body for `message`.
///
/// The top-level `notification` only carries `title` and `body`. The click
/// target goes to `android.notification.click_action`, and the icon to
/// `webpush.notification.icon`. `webpush.fcm_options.link` must be an absolute
/// HTTPS URL, so it is set only when `web_link_base` is known.
pub fn fcm_v1_body(message: &FcmMessage, web_link_base: Option<&str>) -> serde_json::Value {
    let n = &message.notification;
    let mut webpush = serde_json::json!({
        "notification": { "icon": n.icon },
    });
    if let Some(base) = web_link_base {
        webpush["fcm_options"] = serde_json::json!({
            "link": format!("{}{}", base.trim_end_matches('/'), n.click_action),
        });
    }
    serde_json::json!({
        "message": {
            "token": message.token,
            "notification": { "title": n.title, "body": n.body },
            "data": message.data,
            "android": {
                "notification": { "click_action": n.click_action },
            },
            "webpush": webpush,
        }
    })
}

/// Sends one message to one device.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError>;
}

/// FCM HTTP v1 credentials.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub project_id: String,
    pub access_token: String,
    /// Origin of the web client, e.g. `https://voyage.example`. Click routes
    /// are appended to it for web push links.
    pub web_link_base: Option<String>,
}

impl FcmConfig {
    /// Load from the environment. `None` disables FCM.
    ///
    /// | Variable            | Required |
    /// |---------------------|----------|
    /// | `FCM_PROJECT_ID`    | yes      |
    /// | `FCM_ACCESS_TOKEN`  | yes      |
    /// | `FCM_WEB_LINK_BASE` | no       |
    pub fn from_env() -> Option<Self> {
        Some(Self {
            project_id: std::env::var("FCM_PROJECT_ID").ok()?,
            access_token: std::env::var("FCM_ACCESS_TOKEN").ok()?,
            web_link_base: std::env::var("FCM_WEB_LINK_BASE")
                .ok()
                .filter(|base| base.starts_with("https://")),
        })
    }
}

/// APNs token-based credentials.
#[derive(Debug, Clone)]
pub struct ApnsConfig {
    /// Bundle id of the iOS app.
    pub topic: String,
    /// Provider JWT.
    pub auth_token: String,
    pub sandbox: bool,
}

impl ApnsConfig {
    /// Load from the environment. `None` disables APNs.
    ///
    /// | Variable          | Required | Default |
    /// |-------------------|----------|---------|
    /// | `APNS_TOPIC`      | yes      | --       |
    /// | `APNS_AUTH_TOKEN` | yes      | --       |
    /// | `APNS_SANDBOX`    | no       | `false` |
    pub fn from_env() -> Option<Self> {
        Some(Self {
            topic: std::env::var("APNS_TOPIC").ok()?,
            auth_token: std::env::var("APNS_AUTH_TOKEN").ok()?,
            sandbox: std::env::var("APNS_SANDBOX")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    fn host(&self) -> &'static str {
        if self.sandbox {
            APNS_SANDBOX_HOST
        } else {
            APNS_PRODUCTION_HOST
        }
    }
}

/// Talks to FCM and APNs over HTTPS.
pub struct HttpPushTransport {
    client: reqwest::Client,
    fcm: Option<FcmConfig>,
    apns: Option<ApnsConfig>,
}

impl HttpPushTransport {
    pub fn new(fcm: Option<FcmConfig>, apns: Option<ApnsConfig>) -> Result<Self, PushError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, fcm, apns })
    }

    pub fn from_env() -> Result<Self, PushError> {
        Self::new(FcmConfig::from_env(), ApnsConfig::from_env())
    }

    pub fn fcm_enabled(&self) -> bool {
        self.fcm.is_some()
    }

    pub fn apns_enabled(&self) -> bool {
        self.apns.is_some()
    }

    async fn send_fcm(&self, message: &FcmMessage) -> Result<(), PushError> {
        let config = self.fcm.as_ref().ok_or(PushError::NotConfigured("FCM"))?;
        let url = format!("{FCM_API_BASE}/{}/messages:send", config.project_id);
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.access_token)
            .json(&fcm_v1_body(message, config.web_link_base.as_deref()))
            .send()
            .await?;
        check_status(response.status())
    }

    async fn send_apns(&self, message: &ApnsMessage) -> Result<(), PushError> {
        let config = self.apns.as_ref().ok_or(PushError::NotConfigured("APNs"))?;
        let url = format!("{}/3/device/{}", config.host(), message.token);
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.auth_token)
            .header("apns-topic", &config.topic)
            .header("apns-push-type", "alert")
            .json(&serde_json::json!({ "aps": message.aps, "data": message.data }))
            .send()
            .await?;
        check_status(response.status())
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), PushError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(PushError::HttpStatus(status.as_u16()))
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        match message {
            PushMessage::Fcm(m) => self.send_fcm(m).await,
            PushMessage::Apns(m) => self.send_apns(m).await,
        }
    }
}

// ---------------------------------------------------------------------------
// PushGateway
// ---------------------------------------------------------------------------

/// Result of pushing one notification to every device of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushOutcome {
    /// At least one device accepted the message, or there were no devices.
    pub delivered: bool,
    pub device_count: usize,
    pub failed: usize,
    /// First per-device error, if any.
    pub error: Option<String>,
}

/// Fans a notification out to every registered device of a user.
pub struct PushGateway {
    devices: Arc<dyn DeviceTokenStore>,
    transport: Arc<dyn PushTransport>,
    send_timeout: Duration,
}

impl PushGateway {
    pub fn new(devices: Arc<dyn DeviceTokenStore>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            devices,
            transport,
            send_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Bound each per-device send.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Push to all of the user's devices concurrently.
    ///
    /// Per-device failures and timeouts are counted, never propagated; only a
    /// failed device lookup is an error.
    pub async fn send(
        &self,
        user_id: &str,
        notification: &PushNotification,
    ) -> Result<PushOutcome, PushError> {
        let devices = self.devices.list_for_user(user_id).await?;
        if devices.is_empty() {
            tracing::debug!(user_id, "No registered devices, nothing to push");
            return Ok(PushOutcome {
                delivered: true,
                device_count: 0,
                failed: 0,
                error: None,
            });
        }

        let sends = devices
            .iter()
            .map(|device| self.send_one(user_id, device, notification));
        let failures: Vec<PushError> = join_all(sends)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        let outcome = PushOutcome {
            delivered: failures.len() < devices.len(),
            device_count: devices.len(),
            failed: failures.len(),
            error: failures.first().map(ToString::to_string),
        };
        tracing::debug!(
            user_id,
            device_count = outcome.device_count,
            failed = outcome.failed,
            "Push fan-out finished"
        );
        Ok(outcome)
    }

    async fn send_one(
        &self,
        user_id: &str,
        device: &DeviceToken,
        notification: &PushNotification,
    ) -> Result<(), PushError> {
        let message = PushMessage::build(device.platform, &device.token, notification);
        let result = tokio::time::timeout(self.send_timeout, self.transport.send(&message))
            .await
            .unwrap_or(Err(PushError::Timeout(self.send_timeout)));
        if let Err(e) = &result {
            tracing::warn!(
                user_id,
                platform = device.platform.as_str(),
                error = %e,
                "Push send failed"
            );
        }
        result
    }

    /// Register or refresh a device token.
    pub async fn register_device_token(
        &self,
        user_id: &str,
        token: &str,
        platform: Platform,
    ) -> StoreResult<DeviceToken> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CoreError::Validation("device token must not be empty".into()).into());
        }
        if token.len() > MAX_TOKEN_LEN {
            return Err(CoreError::Validation(format!(
                "device token must be at most {MAX_TOKEN_LEN} bytes"
            ))
            .into());
        }
        let device = self.devices.register(user_id, token, platform).await?;
        tracing::info!(user_id, platform = platform.as_str(), "Device token registered");
        Ok(device)
    }

    pub async fn list_device_tokens(&self, user_id: &str) -> StoreResult<Vec<DeviceToken>> {
        self.devices.list_for_user(user_id).await
    }

    /// Remove a device token. Whitespace is trimmed as at registration.
    pub async fn unregister_device_token(&self, user_id: &str, token: &str) -> StoreResult<bool> {
        self.devices.unregister(user_id, token.trim()).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
