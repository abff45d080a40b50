use std::collections::HashMap;
use std::sync::Arc;

use custodian_core::{AccountEvent, EventPublisher, EventPublisherError, EventSubscriber};
use tokio::sync::RwLock;

type Subscribers = HashMap<&'static str, Vec<Arc<dyn EventSubscriber>>>;

/// In-process publisher with a subscriber registry keyed by event type
/// (`"account.created"`, `"account.email_verified"`).
///
/// Subscribers are called in registration order. A failing subscriber is
/// logged and skipped; it never stops delivery to the others.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    subscribers: Arc<RwLock<Subscribers>>,
    published: Arc<RwLock<Vec<AccountEvent>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, event_type: &'static str, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers
            .write()
            .await
            .entry(event_type)
            .or_default()
            .push(subscriber);
    }

    /// Every event published so far, in publish order.
    pub async fn published(&self) -> Vec<AccountEvent> {
        self.published.read().await.clone()
    }

    pub async fn clear(&self) {
        self.published.write().await.clear();
    }
}

#[async_trait::async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: &AccountEvent) -> Result<(), EventPublisherError> {
        self.published.write().await.push(event.clone());

        let subscribers = self
            .subscribers
            .read()
            .await
            .get(event.event_type())
            .cloned()
            .unwrap_or_default();

        for subscriber in subscribers {
            if let Err(e) = subscriber.handle(event).await {
                tracing::error!(
                    event_type = event.event_type(),
                    event_id = %event.event_id(),
                    error = %e,
                    "Event subscriber failed"
                );
            }
        }

        Ok(())
    }
}
