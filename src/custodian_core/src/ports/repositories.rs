use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    email_address::EmailAddress, errors::InfrastructureError, phone_number::PhoneNumber,
    user_account::UserAccount, user_id::UserId, verification_token::VerificationToken,
};

// AccountRepository port trait and errors
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("User with email '{0}' already exists")]
    EmailAlreadyExists(String),
    #[error("User with phone '{0}' already exists")]
    PhoneAlreadyExists(String),
    #[error("Account {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: UserId, expected: u64 },
    #[error("Repository call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Unexpected error {0}")]
    Unexpected(String),
}

impl PartialEq for RepositoryError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::EmailAlreadyExists(a), Self::EmailAlreadyExists(b)) => a == b,
            (Self::PhoneAlreadyExists(a), Self::PhoneAlreadyExists(b)) => a == b,
            (Self::VersionConflict { id: a, .. }, Self::VersionConflict { id: b, .. }) => a == b,
            (Self::Timeout(_), Self::Timeout(_)) => true,
            (Self::Unexpected(_), Self::Unexpected(_)) => true,
            _ => false,
        }
    }
}

impl From<RepositoryError> for InfrastructureError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Timeout(timeout) => InfrastructureError::Timeout {
                operation: "repository call",
                timeout,
            },
            RepositoryError::VersionConflict { .. } => {
                InfrastructureError::ConcurrentModification { attempts: 1 }
            }
            other => InfrastructureError::Repository(other.to_string()),
        }
    }
}

/// Persistence port for the `UserAccount` aggregate.
///
/// `save` is an upsert keyed by `UserId` guarded by the aggregate's `version`:
/// a version of 0 inserts, anything else updates only if the stored version
/// still matches. On success the returned account carries the new version and
/// keeps its pending events so the caller can drain them.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn save(&self, account: UserAccount) -> Result<UserAccount, RepositoryError>;
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError>;
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserAccount>, RepositoryError>;
    async fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<UserAccount>, RepositoryError>;
}

// VerificationTokenStore port trait
/// Remembers which account an emailed verification token was issued for.
///
/// Tokens are single use: `consume` returns the account id at most once and
/// returns `None` for unknown or expired tokens.
#[async_trait]
pub trait VerificationTokenStore: Send + Sync {
    async fn store(
        &self,
        token: &VerificationToken,
        account_id: UserId,
        ttl: Duration,
    ) -> Result<(), RepositoryError>;
    async fn consume(&self, token: &VerificationToken) -> Result<Option<UserId>, RepositoryError>;
}
