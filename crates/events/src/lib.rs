//! Voyage notification runtime services.
//!
//! - [`EventBus`] / [`NotificationRouter`]: in-process intake of
//!   [`NotificationEvent`]s.
//! - [`DeliveryDispatcher`]: persists a notification and fans it out to the
//!   eligible channels.
//! - [`delivery`]: push (FCM/APNs) and templated email gateways.
//! - [`PreferenceResolver`]: per-user settings access.
//! - [`AnalyticsAggregator`]: date-ranged delivery reports.
//! - [`UnreadCounter`]: cancellable polling projection of the unread badge.
//! - [`RetentionSweeper`]: periodic deletion of old records.

pub mod analytics;
pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod preferences;
pub mod retention;
pub mod router;
pub mod unread;

pub use analytics::AnalyticsAggregator;
pub use bus::{EventBus, NotificationEvent};
pub use delivery::email::{EmailConfig, EmailError, EmailGateway, Mailer, SmtpMailer};
pub use delivery::push::{
    HttpPushTransport, PushError, PushGateway, PushMessage, PushNotification, PushOutcome,
    PushTransport,
};
pub use dispatcher::{DeliveryDispatcher, DispatchRequest};
pub use preferences::PreferenceResolver;
pub use retention::RetentionSweeper;
pub use router::NotificationRouter;
pub use unread::UnreadCounter;
