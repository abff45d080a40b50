use std::sync::Arc;

use custodian_core::{AccountEvent, EventPublisher, EventPublisherError};
use redis::{Commands, Connection};
use tokio::sync::RwLock;

/// Appends JSON-encoded events to a Redis list, which downstream consumers
/// drain as a durable queue.
#[derive(Clone)]
pub struct RedisEventPublisher {
    conn: Arc<RwLock<Connection>>,
    key: String,
}

impl RedisEventPublisher {
    pub fn new(conn: Arc<RwLock<Connection>>, key: String) -> Self {
        Self { conn, key }
    }
}

fn encode(event: &AccountEvent) -> Result<String, EventPublisherError> {
    serde_json::to_string(event).map_err(|e| EventPublisherError::Encoding(e.to_string()))
}

#[async_trait::async_trait]
impl EventPublisher for RedisEventPublisher {
    #[tracing::instrument(name = "Publishing event to Redis", skip_all, fields(event_type = event.event_type()))]
    async fn publish(&self, event: &AccountEvent) -> Result<(), EventPublisherError> {
        let payload = encode(event)?;

        let mut conn = self.conn.write().await;
        conn.rpush(&self.key, payload)
            .map_err(|e| EventPublisherError::Transport(e.to_string()))
    }

    /// One RPUSH for the whole batch, so the events land together and in order.
    #[tracing::instrument(name = "Publishing events to Redis", skip_all, fields(count = events.len()))]
    async fn publish_batch(&self, events: &[AccountEvent]) -> Result<(), EventPublisherError> {
        if events.is_empty() {
            return Ok(());
        }
        let payloads = events.iter().map(encode).collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.conn.write().await;
        conn.rpush(&self.key, payloads)
            .map_err(|e| EventPublisherError::Transport(e.to_string()))
    }
}
