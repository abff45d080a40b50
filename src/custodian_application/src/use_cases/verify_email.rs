use chrono::{DateTime, Utc};
use custodian_core::{
    AccountRepository, AccountStatus, EmailAddress, EventPublisher, GENERIC_FAILURE_MESSAGE,
    InfrastructureError, RepositoryError, UserAccount, UserId, ValidationError, VerificationToken,
    VerificationTokenStore,
};

use crate::{
    persistence::{save_with_retry, with_timeout},
    policy::AccountPolicy,
};

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyEmailResponse {
    pub account_id: UserId,
    pub email: EmailAddress,
    pub status: AccountStatus,
    pub verified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyEmailError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Verification link is invalid or has expired")]
    InvalidToken,
    #[error("Account {0} not found")]
    AccountNotFound(UserId),
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<RepositoryError> for VerifyEmailError {
    fn from(error: RepositoryError) -> Self {
        Self::Infrastructure(error.into())
    }
}

impl VerifyEmailError {
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(_) | Self::InvalidToken => Self::InvalidToken.to_string(),
            Self::AccountNotFound(_) => self.to_string(),
            Self::Infrastructure(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

/// Verify email use case - activates an account once its owner has proven
/// control of the address
pub struct VerifyEmailUseCase<R, P, S>
where
    R: AccountRepository,
    P: EventPublisher,
    S: VerificationTokenStore,
{
    repository: R,
    publisher: P,
    token_store: S,
    policy: AccountPolicy,
}

impl<R, P, S> VerifyEmailUseCase<R, P, S>
where
    R: AccountRepository,
    P: EventPublisher,
    S: VerificationTokenStore,
{
    pub fn new(repository: R, publisher: P, token_store: S, policy: AccountPolicy) -> Self {
        Self {
            repository,
            publisher,
            token_store,
            policy,
        }
    }

    /// Verify the account an emailed token was issued for. The token is
    /// spent even when the account turns out to be verified already.
    #[tracing::instrument(name = "VerifyEmailUseCase::execute_with_token", skip_all)]
    pub async fn execute_with_token(
        &self,
        token: &str,
    ) -> Result<VerifyEmailResponse, VerifyEmailError> {
        let token = VerificationToken::parse(token)?;

        let account_id = with_timeout(
            self.policy.repository_timeout,
            self.token_store.consume(&token),
        )
        .await?
        .ok_or(VerifyEmailError::InvalidToken)?;

        self.execute(account_id).await
    }

    /// Accounts that are not awaiting verification are returned unchanged.
    #[tracing::instrument(name = "VerifyEmailUseCase::execute", skip(self))]
    pub async fn execute(&self, account_id: UserId) -> Result<VerifyEmailResponse, VerifyEmailError> {
        let account = with_timeout(
            self.policy.repository_timeout,
            self.repository.find_by_id(&account_id),
        )
        .await?
        .ok_or(VerifyEmailError::AccountNotFound(account_id))?;

        if !account.status().requires_verification() {
            return Ok(response(&account));
        }

        let mut account = save_with_retry(
            &self.repository,
            &self.policy,
            account,
            |account: &mut UserAccount| -> Result<(), VerifyEmailError> {
                account.verify_email();
                Ok(())
            },
        )
        .await?;
        tracing::info!(account_id = %account_id, status = %account.status(), "Email verified");

        let events = account.take_events();
        if let Err(e) = self.publisher.publish_batch(&events).await {
            tracing::error!(account_id = %account_id, error = %e, "Failed to publish account events");
        }

        Ok(response(&account))
    }
}

fn response(account: &UserAccount) -> VerifyEmailResponse {
    VerifyEmailResponse {
        account_id: account.id(),
        email: account.email().clone(),
        status: account.status(),
        verified_at: account.verified_at(),
    }
}
