use std::sync::Arc;

use async_trait::async_trait;
use secrecy::Secret;
use thiserror::Error;

use crate::domain::{
    email_address::EmailAddress, errors::ValidationError, events::AccountEvent,
    user_id::UserId, verification_token::VerificationToken,
};

// PasswordHasher port
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Fails with a `ValidationError` on empty or too short input, or when the
    /// primitive itself fails.
    async fn hash(&self, password: &Secret<String>) -> Result<Secret<String>, ValidationError>;

    /// Never fails: a malformed stored hash simply does not match.
    async fn verify(&self, password: &Secret<String>, password_hash: &Secret<String>) -> bool;
}

// NotificationService port and errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Failed to render notification: {0}")]
    Template(String),
    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_verification_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError>;

    async fn send_password_reset_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError>;
}

#[async_trait]
impl<T: NotificationService + ?Sized> NotificationService for Arc<T> {
    async fn send_verification_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        (**self).send_verification_email(recipient, token).await
    }

    async fn send_password_reset_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        (**self).send_password_reset_email(recipient, token).await
    }
}

// EventPublisher port and errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventPublisherError {
    #[error("Failed to encode event: {0}")]
    Encoding(String),
    #[error("Event transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &AccountEvent) -> Result<(), EventPublisherError>;

    /// Publishes in order, stopping at the first failure.
    async fn publish_batch(&self, events: &[AccountEvent]) -> Result<(), EventPublisherError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}

/// Handler registered on an event bus for one event type.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn handle(&self, event: &AccountEvent) -> Result<(), String>;
}

// TokenIssuer port and errors
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: Secret<String>,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenIssuerError {
    #[error("Token service unreachable: {0}")]
    Unavailable(String),
    #[error("Token service rejected the request with status {0}")]
    Rejected(u16),
    #[error("Malformed token response: {0}")]
    InvalidResponse(String),
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, account_id: &UserId) -> Result<IssuedToken, TokenIssuerError>;
}

#[async_trait]
impl<T: TokenIssuer + ?Sized> TokenIssuer for Arc<T> {
    async fn issue(&self, account_id: &UserId) -> Result<IssuedToken, TokenIssuerError> {
        (**self).issue(account_id).await
    }
}
