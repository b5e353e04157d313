//! Service wiring shared by the binary and the integration tests.

use std::sync::Arc;
use std::time::Duration;

use voyage_core::templates::TemplateCatalog;
use voyage_db::{DbPool, Stores};
use voyage_events::{
    AnalyticsAggregator, DeliveryDispatcher, EmailGateway, EventBus, Mailer, PreferenceResolver,
    PushGateway, PushTransport,
};

use crate::config::ServerConfig;
use crate::state::AppState;

/// External delivery transports. A missing mailer disables email.
pub struct Transports {
    pub push: Arc<dyn PushTransport>,
    pub mailer: Option<Arc<dyn Mailer>>,
}

/// Build every engine service over `stores` and bundle them into [`AppState`].
pub fn build_state(
    config: ServerConfig,
    pool: Option<DbPool>,
    stores: Stores,
    transports: Transports,
    catalog: TemplateCatalog,
) -> AppState {
    let channel_timeout = Duration::from_secs(config.channel_timeout_secs);

    let preferences = PreferenceResolver::new(Arc::clone(&stores.preferences));
    let push = Arc::new(
        PushGateway::new(Arc::clone(&stores.devices), transports.push)
            .with_send_timeout(channel_timeout),
    );
    let email = Arc::new(EmailGateway::new(
        Arc::clone(&stores.preferences),
        catalog,
        transports.mailer,
    ));
    let dispatcher = Arc::new(
        DeliveryDispatcher::new(
            Arc::clone(&stores.notifications),
            Arc::clone(&stores.deliveries),
            preferences.clone(),
            Arc::clone(&push),
            Arc::clone(&email),
        )
        .with_channel_timeout(channel_timeout),
    );
    let analytics = AnalyticsAggregator::new(
        Arc::clone(&stores.notifications),
        Arc::clone(&stores.deliveries),
        Arc::clone(&stores.devices),
    );

    AppState {
        config: Arc::new(config),
        pool,
        stores,
        dispatcher,
        preferences,
        push,
        email,
        analytics,
        event_bus: Arc::new(EventBus::default()),
    }
}
