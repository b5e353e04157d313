//! Templated email delivery via SMTP.
//!
//! [`EmailGateway`] resolves the user's address and opt-ins, renders the
//! template bound to the notification type, and hands the result to a
//! [`Mailer`]. [`SmtpMailer`] wraps the `lettre` async SMTP transport; if
//! `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and the
//! gateway runs without a mailer, reporting the channel unavailable.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use voyage_core::channels::Channel;
use voyage_core::error::CoreError;
use voyage_core::notification::NotificationType;
use voyage_core::preferences::{EmailPreferences, EmailPreferencesUpdate};
use voyage_core::templates::{RenderedEmail, TemplateCatalog};
use voyage_db::{PreferenceStore, StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Unmapped template, missing address, or no mailer configured.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "Voyage <noreply@voyage.local>";

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" mailbox.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured.
    ///
    /// | Variable        | Required | Default                         |
    /// |-----------------|----------|---------------------------------|
    /// | `SMTP_HOST`     | yes      | --                               |
    /// | `SMTP_PORT`     | no       | `587`                           |
    /// | `SMTP_FROM`     | no       | `Voyage <noreply@voyage.local>` |
    /// | `SMTP_USER`     | no       | --                               |
    /// | `SMTP_PASSWORD` | no       | --                               |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Delivers one rendered email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError>;
}

/// Plain-text mail over STARTTLS SMTP.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the pooled transport once; connections are opened lazily.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from_address.parse()?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EmailGateway
// ---------------------------------------------------------------------------

/// Per-user email preferences plus templated sending.
pub struct EmailGateway {
    preferences: Arc<dyn PreferenceStore>,
    catalog: TemplateCatalog,
    mailer: Option<Arc<dyn Mailer>>,
}

impl EmailGateway {
    pub fn new(
        preferences: Arc<dyn PreferenceStore>,
        catalog: TemplateCatalog,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            preferences,
            catalog,
            mailer,
        }
    }

    /// Template bound to `ty`, or `UnmappedTemplate`.
    pub fn template_for(&self, ty: NotificationType) -> Result<&str, CoreError> {
        self.catalog.template_for(ty)
    }

    /// Render `template_id` with `vars` and mail it to the user's address.
    pub async fn send_templated(
        &self,
        user_id: &str,
        template_id: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<bool, EmailError> {
        let email = self.catalog.render(template_id, vars)?;

        let address = self
            .get_preferences(user_id)
            .await?
            .address
            .ok_or_else(|| unavailable("no email address on file"))?;
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| unavailable("SMTP is not configured"))?;

        mailer.send(&address, &email).await?;
        tracing::info!(user_id, template_id, "Notification email sent");
        Ok(true)
    }

    /// Stored preferences, or the defaults.
    pub async fn get_preferences(&self, user_id: &str) -> StoreResult<EmailPreferences> {
        Ok(self
            .preferences
            .get_email_preferences(user_id)
            .await?
            .unwrap_or_default())
    }

    /// Merge `update` into the stored preferences.
    ///
    /// A non-empty address must parse as an RFC 5321 mailbox address; an
    /// empty one clears the stored address.
    pub async fn update_preferences(
        &self,
        user_id: &str,
        update: &EmailPreferencesUpdate,
    ) -> StoreResult<EmailPreferences> {
        if let Some(addr) = update.address.as_deref().map(str::trim) {
            if !addr.is_empty() {
                check_address(addr)?;
            }
        }
        self.preferences.merge_email_preferences(user_id, update).await
    }
}

fn check_address(addr: &str) -> Result<(), CoreError> {
    Address::from_str(addr)
        .map(|_| ())
        .map_err(|_| CoreError::Validation(format!("'{addr}' is not a valid email address")))
}

fn unavailable(reason: &str) -> CoreError {
    CoreError::ChannelUnavailable {
        channel: Channel::Email,
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use voyage_core::templates::TEMPLATE_NEW_MESSAGE;
    use voyage_db::memory::MemoryStore;

    use super::*;
    use crate::delivery::fakes::FakeMailer;

    fn vars() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("senderName".to_string(), "Kim".to_string()),
            ("message".to_string(), "Is the loft free?".to_string()),
            ("conversationId".to_string(), "c-7".to_string()),
        ])
    }

    async fn gateway_with_address(mailer: Option<Arc<dyn Mailer>>) -> EmailGateway {
        let store = Arc::new(MemoryStore::new());
        let gateway = EmailGateway::new(store, TemplateCatalog::default(), mailer);
        gateway
            .update_preferences(
                "u-1",
                &EmailPreferencesUpdate {
                    address: Some("guest@example.com".into()),
                    categories: None,
                },
            )
            .await
            .unwrap();
        gateway
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[tokio::test]
    async fn sends_rendered_template() {
        let mailer = Arc::new(FakeMailer::default());
        let gateway = gateway_with_address(Some(mailer.clone())).await;

        let sent = gateway
            .send_templated("u-1", TEMPLATE_NEW_MESSAGE, &vars())
            .await
            .unwrap();
        assert!(sent);

        let outbox = mailer.sent();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].0, "guest@example.com");
        assert_eq!(outbox[0].1.subject, "New message from Kim");
        assert!(outbox[0].1.body.contains("/messages/c-7"));
    }

    #[tokio::test]
    async fn missing_address_is_channel_unavailable() {
        let gateway = EmailGateway::new(
            Arc::new(MemoryStore::new()),
            TemplateCatalog::default(),
            Some(Arc::new(FakeMailer::default())),
        );
        let err = gateway
            .send_templated("u-1", TEMPLATE_NEW_MESSAGE, &vars())
            .await
            .unwrap_err();
        assert_matches!(
            err,
            EmailError::Core(CoreError::ChannelUnavailable { channel: Channel::Email, .. })
        );
    }

    #[tokio::test]
    async fn unconfigured_mailer_is_channel_unavailable() {
        let gateway = gateway_with_address(None).await;
        let err = gateway
            .send_templated("u-1", TEMPLATE_NEW_MESSAGE, &vars())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SMTP is not configured"));
    }

    #[tokio::test]
    async fn unknown_template_is_not_found() {
        let gateway = gateway_with_address(Some(Arc::new(FakeMailer::default()))).await;
        let err = gateway.send_templated("u-1", "nope", &vars()).await.unwrap_err();
        assert_matches!(err, EmailError::Core(CoreError::NotFound { .. }));
    }

    #[test]
    fn marketing_is_unmapped_by_default() {
        let gateway = EmailGateway::new(
            Arc::new(MemoryStore::new()),
            TemplateCatalog::default(),
            None,
        );
        assert_matches!(
            gateway.template_for(NotificationType::Marketing),
            Err(CoreError::UnmappedTemplate(NotificationType::Marketing))
        );
    }

    #[tokio::test]
    async fn update_rejects_unparseable_address() {
        let gateway = EmailGateway::new(
            Arc::new(MemoryStore::new()),
            TemplateCatalog::default(),
            None,
        );
        for bad in ["no-at-sign", "a b@c.com", "@example.com", "guest@"] {
            let err = gateway
                .update_preferences(
                    "u-1",
                    &EmailPreferencesUpdate {
                        address: Some(bad.into()),
                        categories: None,
                    },
                )
                .await
                .unwrap_err();
            assert_matches!(err, StoreError::Core(CoreError::Validation(_)), "{bad}");
        }
        assert!(gateway.get_preferences("u-1").await.unwrap().address.is_none());
    }

    #[tokio::test]
    async fn update_accepts_padded_address_and_clears_with_empty() {
        let gateway = gateway_with_address(None).await;
        let padded = gateway
            .update_preferences(
                "u-1",
                &EmailPreferencesUpdate {
                    address: Some("  host@example.com ".into()),
                    categories: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(padded.address.as_deref(), Some("host@example.com"));

        let cleared = gateway
            .update_preferences(
                "u-1",
                &EmailPreferencesUpdate {
                    address: Some(String::new()),
                    categories: None,
                },
            )
            .await
            .unwrap();
        assert!(cleared.address.is_none());
    }

    #[tokio::test]
    async fn preferences_default_and_merge() {
        let gateway = EmailGateway::new(
            Arc::new(MemoryStore::new()),
            TemplateCatalog::default(),
            None,
        );
        let prefs = gateway.get_preferences("u-1").await.unwrap();
        assert!(prefs.address.is_none());
        assert!(!prefs.opted_in(NotificationType::Marketing));

        let merged = gateway
            .update_preferences(
                "u-1",
                &EmailPreferencesUpdate {
                    address: None,
                    categories: Some(BTreeMap::from([(NotificationType::Review, false)])),
                },
            )
            .await
            .unwrap();
        assert!(!merged.opted_in(NotificationType::Review));
        assert!(merged.opted_in(NotificationType::Payment));
    }
}
