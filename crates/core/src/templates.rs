//! Email template catalogue and rendering.
//!
//! Every notification type except marketing has a built-in template. Marketing
//! mail must be mapped explicitly; an unmapped type is a configuration bug and
//! surfaces as [`CoreError::UnmappedTemplate`].

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::notification::NotificationType;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TEMPLATE_NEW_MESSAGE: &str = "new-message";
pub const TEMPLATE_RESERVATION_CONFIRMATION: &str = "reservation-confirmation";
pub const TEMPLATE_NEW_REVIEW: &str = "new-review";
pub const TEMPLATE_PAYMENT_CONFIRMATION: &str = "payment-confirmation";
pub const TEMPLATE_WELCOME: &str = "welcome";

/// Available for marketing mail but never mapped by default.
pub const TEMPLATE_MARKETING_CAMPAIGN: &str = "marketing-campaign";

/// Regex pattern matching `{{ placeholder }}` tokens in templates.
pub const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Subject and body source of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

impl EmailTemplate {
    fn new(subject: &str, body: &str) -> Self {
        Self {
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }
}

/// A template with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEmail {
    pub template_id: String,
    pub subject: String,
    pub body: String,
}

/// Type-to-template mapping plus the template sources.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    mapping: HashMap<NotificationType, String>,
    templates: HashMap<String, EmailTemplate>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        let mapping = HashMap::from([
            (NotificationType::Message, TEMPLATE_NEW_MESSAGE.to_string()),
            (
                NotificationType::Reservation,
                TEMPLATE_RESERVATION_CONFIRMATION.to_string(),
            ),
            (NotificationType::Review, TEMPLATE_NEW_REVIEW.to_string()),
            (
                NotificationType::Payment,
                TEMPLATE_PAYMENT_CONFIRMATION.to_string(),
            ),
            (NotificationType::System, TEMPLATE_WELCOME.to_string()),
        ]);

        let templates = HashMap::from([
            (
                TEMPLATE_NEW_MESSAGE.to_string(),
                EmailTemplate::new(
                    "New message from {{senderName}}",
                    "{{message}}\n\nReply in the conversation: /messages/{{conversationId}}",
                ),
            ),
            (
                TEMPLATE_RESERVATION_CONFIRMATION.to_string(),
                EmailTemplate::new(
                    "{{title}}",
                    "{{message}}\n\nListing: {{listingTitle}}\nCheck-in: {{checkIn}}\n\
                     Check-out: {{checkOut}}\nStatus: {{status}}",
                ),
            ),
            (
                TEMPLATE_NEW_REVIEW.to_string(),
                EmailTemplate::new(
                    "{{reviewerName}} left you a {{rating}}-star review",
                    "{{message}}",
                ),
            ),
            (
                TEMPLATE_PAYMENT_CONFIRMATION.to_string(),
                EmailTemplate::new(
                    "{{title}}",
                    "{{message}}\n\nAmount: {{amount}} {{currency}}\nStatus: {{status}}\n\
                     Reference: {{paymentId}}",
                ),
            ),
            (
                TEMPLATE_WELCOME.to_string(),
                EmailTemplate::new("{{title}}", "{{message}}"),
            ),
            (
                TEMPLATE_MARKETING_CAMPAIGN.to_string(),
                EmailTemplate::new("{{title}}", "{{message}}\n\nUnsubscribe in your settings."),
            ),
        ]);

        Self { mapping, templates }
    }
}

impl TemplateCatalog {
    /// Bind `ty` to `template_id`, replacing any previous mapping.
    pub fn with_mapping(mut self, ty: NotificationType, template_id: impl Into<String>) -> Self {
        self.mapping.insert(ty, template_id.into());
        self
    }

    /// Register or replace a template source.
    pub fn with_template(mut self, template_id: impl Into<String>, template: EmailTemplate) -> Self {
        self.templates.insert(template_id.into(), template);
        self
    }

    /// Resolve the template id bound to `ty`.
    pub fn template_for(&self, ty: NotificationType) -> Result<&str, CoreError> {
        self.mapping
            .get(&ty)
            .map(String::as_str)
            .ok_or(CoreError::UnmappedTemplate(ty))
    }

    pub fn get(&self, template_id: &str) -> Option<&EmailTemplate> {
        self.templates.get(template_id)
    }

    /// Render `template_id` with `vars`. Unknown placeholders render empty.
    pub fn render(
        &self,
        template_id: &str,
        vars: &BTreeMap<String, String>,
    ) -> Result<RenderedEmail, CoreError> {
        let template = self.get(template_id).ok_or_else(|| CoreError::NotFound {
            entity: "EmailTemplate",
            id: template_id.to_string(),
        })?;
        Ok(RenderedEmail {
            template_id: template_id.to_string(),
            subject: substitute(&template.subject, vars),
            body: substitute(&template.body, vars),
        })
    }
}

/// Replace every `{{name}}` in `source` with `vars[name]` (or nothing).
pub fn substitute(source: &str, vars: &BTreeMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(source, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
