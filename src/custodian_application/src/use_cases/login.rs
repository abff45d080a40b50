use chrono::{DateTime, Utc};
use custodian_core::{
    AccountRepository, AccountStatus, EmailAddress, GENERIC_FAILURE_MESSAGE, InfrastructureError,
    InvalidCredentialsError, IssuedToken, PasswordHasher, RepositoryError, TokenIssuer,
    UserAccount, UserId, ValidationError,
};
use secrecy::{ExposeSecret, Secret};

use crate::{
    persistence::{save_with_retry, with_timeout},
    policy::AccountPolicy,
};

/// Response from login use case
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub account_id: UserId,
    pub email: EmailAddress,
    pub status: AccountStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub requires_verification: bool,
    /// Absent when the token service could not be reached and strict
    /// issuance is off.
    pub token: Option<IssuedToken>,
}

/// Error types specific to login use case
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidCredentials(#[from] InvalidCredentialsError),
    #[error("Email address {email} has not been verified")]
    EmailNotVerified {
        email: EmailAddress,
        requires_verification: bool,
    },
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<RepositoryError> for LoginError {
    fn from(error: RepositoryError) -> Self {
        Self::Infrastructure(error.into())
    }
}

impl LoginError {
    /// Message safe to show to the caller: credential failures never reveal
    /// whether the email or the password was wrong.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidCredentials(e) => e.public_message(),
            Self::Infrastructure(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

/// Login use case - authenticates credentials and enforces lockout and
/// verification policy
pub struct LoginUseCase<R, H, T>
where
    R: AccountRepository,
    H: PasswordHasher,
    T: TokenIssuer,
{
    repository: R,
    hasher: H,
    token_issuer: T,
    policy: AccountPolicy,
}

impl<R, H, T> LoginUseCase<R, H, T>
where
    R: AccountRepository,
    H: PasswordHasher,
    T: TokenIssuer,
{
    pub fn new(repository: R, hasher: H, token_issuer: T, policy: AccountPolicy) -> Self {
        Self {
            repository,
            hasher,
            token_issuer,
            policy,
        }
    }

    /// Execute the login use case
    ///
    /// # Arguments
    /// * `email` - Raw email address
    /// * `password` - Plain text password
    ///
    /// # Returns
    /// LoginResponse on success. Every outcome that changes the lockout
    /// counter is persisted before this returns.
    #[tracing::instrument(name = "LoginUseCase::execute", skip(self, password))]
    pub async fn execute(
        &self,
        email: &str,
        password: Secret<String>,
    ) -> Result<LoginResponse, LoginError> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        if password.expose_secret().is_empty() {
            return Err(ValidationError::EmptyPassword.into());
        }

        let email = EmailAddress::parse(email)?;

        let account = with_timeout(
            self.policy.repository_timeout,
            self.repository.find_by_email(&email),
        )
        .await?
        .ok_or_else(|| InvalidCredentialsError::InvalidEmail(email.to_string()))?;

        if account.is_locked() {
            tracing::info!(account_id = %account.id(), "Login attempt on locked account");
            return Err(locked(&account).into());
        }

        if !self
            .hasher
            .verify(&password, account.password_hash())
            .await
        {
            return Err(self.record_failure(account).await);
        }

        self.ensure_login_allowed(&account)?;

        let account = save_with_retry(
            &self.repository,
            &self.policy,
            account,
            |account: &mut UserAccount| -> Result<(), LoginError> {
                // Concurrent writers may have changed the reloaded copy.
                if account.is_locked() {
                    return Err(locked(account).into());
                }
                self.ensure_login_allowed(account)?;
                account.record_successful_login();
                Ok(())
            },
        )
        .await?;
        tracing::info!(account_id = %account.id(), "Login succeeded");

        let token = match self.token_issuer.issue(&account.id()).await {
            Ok(token) => Some(token),
            Err(e) if self.policy.strict_token_issuance => {
                tracing::error!(account_id = %account.id(), error = %e, "Token issuance failed");
                return Err(InfrastructureError::TokenIssuance(e.to_string()).into());
            }
            Err(e) => {
                tracing::warn!(account_id = %account.id(), error = %e, "Token issuance failed, responding without a token");
                None
            }
        };

        Ok(LoginResponse {
            account_id: account.id(),
            email: account.email().clone(),
            status: account.status(),
            last_login_at: account.last_login_at(),
            requires_verification: !account.is_email_verified(),
            token,
        })
    }

    /// Status and verification gates applied once the password matched.
    fn ensure_login_allowed(&self, account: &UserAccount) -> Result<(), LoginError> {
        let status = account.status();
        if !status.can_login() && !status.requires_verification() {
            return Err(InvalidCredentialsError::AccountUnavailable(status).into());
        }

        if self.policy.require_email_verification && !account.is_email_verified() {
            return Err(LoginError::EmailNotVerified {
                email: account.email().clone(),
                requires_verification: true,
            });
        }

        Ok(())
    }

    /// Persist a failed attempt and pick the error to report: the failure that
    /// crosses the threshold already reports the lockout.
    async fn record_failure(&self, account: UserAccount) -> LoginError {
        let max_attempts = self.policy.max_login_attempts;
        let lockout_duration = self.policy.lockout_duration;

        let saved = save_with_retry(
            &self.repository,
            &self.policy,
            account,
            |account: &mut UserAccount| -> Result<(), LoginError> {
                account.record_failed_login(max_attempts, lockout_duration);
                Ok(())
            },
        )
        .await;

        match saved {
            Ok(account) if account.is_locked() => {
                tracing::warn!(
                    account_id = %account.id(),
                    failed_attempts = account.failed_login_attempts(),
                    "Account locked after repeated failed logins"
                );
                locked(&account).into()
            }
            Ok(_) => InvalidCredentialsError::InvalidPassword.into(),
            Err(e) => e,
        }
    }
}

fn locked(account: &UserAccount) -> InvalidCredentialsError {
    InvalidCredentialsError::AccountLocked {
        locked_until: account.locked_until(),
    }
}
