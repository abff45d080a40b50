use std::sync::Arc;

use custodian_core::{EmailAddress, NotificationError, NotificationService, VerificationToken};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    Verification { recipient: String, token: String },
    PasswordReset { recipient: String, token: String },
}

/// Logs notifications instead of sending them and keeps a copy for inspection.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationService {
    sent: Arc<RwLock<Vec<SentNotification>>>,
}

impl MockNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    /// Token of the most recent notification addressed to `recipient`.
    pub async fn last_token_for(&self, recipient: &EmailAddress) -> Option<String> {
        self.sent
            .read()
            .await
            .iter()
            .rev()
            .find_map(|notification| match notification {
                SentNotification::Verification { recipient: to, token }
                | SentNotification::PasswordReset { recipient: to, token }
                    if to == recipient.as_str() =>
                {
                    Some(token.clone())
                }
                _ => None,
            })
    }
}

#[async_trait::async_trait]
impl NotificationService for MockNotificationService {
    async fn send_verification_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        tracing::info!(%recipient, "Verification email (not sent)");
        self.sent.write().await.push(SentNotification::Verification {
            recipient: recipient.to_string(),
            token: token.as_str().to_string(),
        });
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        tracing::info!(%recipient, "Password reset email (not sent)");
        self.sent.write().await.push(SentNotification::PasswordReset {
            recipient: recipient.to_string(),
            token: token.as_str().to_string(),
        });
        Ok(())
    }
}
