//! Bus-to-dispatcher bridge.
//!
//! [`NotificationRouter`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and dispatches every event it receives. A failed dispatch is logged and
//! the loop moves on.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::bus::NotificationEvent;
use crate::dispatcher::DeliveryDispatcher;

/// Consumes published events and hands them to the dispatcher.
pub struct NotificationRouter {
    dispatcher: Arc<DeliveryDispatcher>,
}

impl NotificationRouter {
    pub fn new(dispatcher: Arc<DeliveryDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run the routing loop.
    ///
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](crate::bus::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<NotificationEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    async fn route(&self, event: NotificationEvent) {
        let user_id = event.request.user_id.clone();
        let source = event.source.unwrap_or_default();
        if let Err(e) = self.dispatcher.dispatch(event.request).await {
            tracing::error!(
                error = %e,
                user_id = %user_id,
                source = %source,
                "Failed to dispatch notification event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use voyage_core::filter::NotificationFilter;
    use voyage_core::notification::{MessageData, NotificationData, NotificationType};
    use voyage_core::templates::TemplateCatalog;
    use voyage_db::memory::MemoryStore;
    use voyage_db::NotificationStore;

    use super::*;
    use crate::bus::EventBus;
    use crate::delivery::email::EmailGateway;
    use crate::delivery::fakes::FakePushTransport;
    use crate::delivery::push::PushGateway;
    use crate::dispatcher::DispatchRequest;
    use crate::preferences::PreferenceResolver;

    #[tokio::test]
    async fn routes_events_until_bus_closes() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(DeliveryDispatcher::new(
            store.clone(),
            store.clone(),
            PreferenceResolver::new(store.clone()),
            Arc::new(PushGateway::new(
                store.clone(),
                Arc::new(FakePushTransport::default()),
            )),
            Arc::new(EmailGateway::new(store.clone(), TemplateCatalog::default(), None)),
        ));

        let bus = EventBus::default();
        let handle = tokio::spawn(NotificationRouter::new(dispatcher).run(bus.subscribe()));

        bus.publish(
            NotificationEvent::new(DispatchRequest {
                user_id: "host-1".into(),
                notification_type: NotificationType::Message,
                title: "New message".into(),
                message: "Arriving late tonight".into(),
                data: NotificationData::Message(MessageData {
                    sender_id: "guest-1".into(),
                    sender_name: "Ana".into(),
                    conversation_id: "c-1".into(),
                    sender_avatar: None,
                }),
            })
            .with_source("messaging"),
        );
        drop(bus);
        handle.await.unwrap();

        let listed = store
            .list("host-1", &NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].notification_type, NotificationType::Message);
    }
}
