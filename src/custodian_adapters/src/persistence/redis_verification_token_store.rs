use std::sync::Arc;
use std::time::Duration;

use custodian_core::{RepositoryError, UserId, VerificationToken, VerificationTokenStore};
use redis::{Commands, Connection};
use tokio::sync::RwLock;

const VERIFICATION_TOKEN_KEY_PREFIX: &str = "verification_token:";

/// Verification tokens kept in Redis, expired by the server through the key TTL.
#[derive(Clone)]
pub struct RedisVerificationTokenStore {
    conn: Arc<RwLock<Connection>>,
}

impl RedisVerificationTokenStore {
    pub fn new(conn: Arc<RwLock<Connection>>) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl VerificationTokenStore for RedisVerificationTokenStore {
    #[tracing::instrument(name = "Storing verification token in Redis", skip_all, fields(account_id = %account_id))]
    async fn store(
        &self,
        token: &VerificationToken,
        account_id: UserId,
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        let key = get_key(token);
        // Redis rejects a zero expiry.
        let ttl_seconds = ttl.as_secs().max(1);

        let mut conn = self.conn.write().await;
        conn.set_ex::<_, _, ()>(&key, account_id.to_string(), ttl_seconds)
            .map_err(|e| RepositoryError::Unexpected(e.to_string()))
    }

    #[tracing::instrument(name = "Consuming verification token from Redis", skip_all)]
    async fn consume(&self, token: &VerificationToken) -> Result<Option<UserId>, RepositoryError> {
        let key = get_key(token);

        let stored: Option<String> = {
            let mut conn = self.conn.write().await;
            conn.get_del(&key)
                .map_err(|e| RepositoryError::Unexpected(e.to_string()))?
        };

        stored
            .map(|raw| {
                raw.parse::<UserId>()
                    .map_err(|e| RepositoryError::Unexpected(e.to_string()))
            })
            .transpose()
    }
}

fn get_key(token: &VerificationToken) -> String {
    format!("{}{}", VERIFICATION_TOKEN_KEY_PREFIX, token.as_str())
}
