use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use custodian_core::{RepositoryError, UserId, VerificationToken, VerificationTokenStore};
use tokio::sync::RwLock;

/// In-process verification token store. Expired entries are dropped when
/// they are looked up.
#[derive(Default, Clone)]
pub struct HashMapVerificationTokenStore {
    tokens: Arc<RwLock<HashMap<String, (UserId, DateTime<Utc>)>>>,
}

impl HashMapVerificationTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl VerificationTokenStore for HashMapVerificationTokenStore {
    async fn store(
        &self,
        token: &VerificationToken,
        account_id: UserId,
        ttl: Duration,
    ) -> Result<(), RepositoryError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| RepositoryError::Unexpected(e.to_string()))?;
        let expires_at = Utc::now() + ttl;

        self.tokens
            .write()
            .await
            .insert(token.as_str().to_string(), (account_id, expires_at));
        Ok(())
    }

    async fn consume(&self, token: &VerificationToken) -> Result<Option<UserId>, RepositoryError> {
        let entry = self.tokens.write().await.remove(token.as_str());

        Ok(entry
            .filter(|(_, expires_at)| *expires_at > Utc::now())
            .map(|(account_id, _)| account_id))
    }
}
