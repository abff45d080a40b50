use custodian_core::{
    AccountRepository, EmailAddress, GENERIC_FAILURE_MESSAGE, InfrastructureError,
    NotificationService, RepositoryError, ValidationError, VerificationToken,
};

use crate::{persistence::with_timeout, policy::AccountPolicy};

pub const PASSWORD_RESET_ACKNOWLEDGEMENT: &str =
    "If an account with that email exists, a password reset link has been sent.";

/// Same acknowledgement whether or not the account exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetResponse {
    pub message: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum RequestPasswordResetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<RepositoryError> for RequestPasswordResetError {
    fn from(error: RepositoryError) -> Self {
        Self::Infrastructure(error.into())
    }
}

impl RequestPasswordResetError {
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Infrastructure(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

/// Request password reset use case - mails a reset link without revealing
/// whether the address is registered
pub struct RequestPasswordResetUseCase<R, N>
where
    R: AccountRepository,
    N: NotificationService,
{
    repository: R,
    notifier: N,
    policy: AccountPolicy,
}

impl<R, N> RequestPasswordResetUseCase<R, N>
where
    R: AccountRepository,
    N: NotificationService,
{
    pub fn new(repository: R, notifier: N, policy: AccountPolicy) -> Self {
        Self {
            repository,
            notifier,
            policy,
        }
    }

    #[tracing::instrument(name = "RequestPasswordResetUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        email: &str,
    ) -> Result<PasswordResetResponse, RequestPasswordResetError> {
        let email = EmailAddress::parse(email)?;

        let account = with_timeout(
            self.policy.repository_timeout,
            self.repository.find_by_email(&email),
        )
        .await?;

        match account {
            Some(account) if !account.status().is_terminal() => {
                let token = VerificationToken::generate();
                if let Err(e) = self
                    .notifier
                    .send_password_reset_email(account.email(), &token)
                    .await
                {
                    tracing::warn!(account_id = %account.id(), error = %e, "Failed to send password reset email");
                }
            }
            Some(account) => {
                tracing::info!(account_id = %account.id(), status = %account.status(), "Password reset skipped");
            }
            None => tracing::debug!("Password reset requested for unknown email"),
        }

        Ok(PasswordResetResponse {
            message: PASSWORD_RESET_ACKNOWLEDGEMENT,
        })
    }
}
