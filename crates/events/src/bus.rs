//! In-process notification intake backed by a `tokio::sync::broadcast` channel.
//!
//! Producers inside the process (booking, messaging, payments) publish a
//! [`NotificationEvent`]; the [`NotificationRouter`](crate::router::NotificationRouter)
//! consumes it and hands it to the dispatcher. Share the bus via
//! `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::dispatcher::DispatchRequest;

// ---------------------------------------------------------------------------
// NotificationEvent
// ---------------------------------------------------------------------------

/// A request to notify one user, plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub request: DispatchRequest,

    /// Producing subsystem, e.g. `"booking"`. Only used for logging.
    pub source: Option<String>,

    /// When the event was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(request: DispatchRequest) -> Self {
        Self {
            request,
            source: None,
            timestamp: Utc::now(),
        }
    }

    /// Tag the producing subsystem.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`NotificationEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<NotificationEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it; `0` means the
    /// event was dropped because no router is running.
    pub fn publish(&self, event: NotificationEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use voyage_core::notification::{FreeFormData, NotificationData, NotificationType};

    use super::*;

    fn request() -> DispatchRequest {
        DispatchRequest {
            user_id: "u-1".into(),
            notification_type: NotificationType::System,
            title: "Maintenance tonight".into(),
            message: String::new(),
            data: NotificationData::System(FreeFormData::default()),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(NotificationEvent::new(request()).with_source("ops")), 2);

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.request.title, "Maintenance tonight");
        assert_eq!(e2.source.as_deref(), Some("ops"));
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(NotificationEvent::new(request())), 0);
    }
}
