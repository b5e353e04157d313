use std::sync::Arc;

use voyage_db::{DbPool, Stores};
use voyage_events::{
    AnalyticsAggregator, DeliveryDispatcher, EmailGateway, EventBus, PreferenceResolver,
    PushGateway,
};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (JWT secret, timeouts).
    pub config: Arc<ServerConfig>,
    /// Database pool when running on PostgreSQL; `None` for in-memory stores.
    pub pool: Option<DbPool>,
    /// The selected store adapters.
    pub stores: Stores,
    pub dispatcher: Arc<DeliveryDispatcher>,
    pub preferences: PreferenceResolver,
    pub push: Arc<PushGateway>,
    pub email: Arc<EmailGateway>,
    pub analytics: AnalyticsAggregator,
    /// In-process intake for notification events.
    pub event_bus: Arc<EventBus>,
}
