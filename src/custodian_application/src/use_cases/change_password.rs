use custodian_core::{
    AccountRepository, GENERIC_FAILURE_MESSAGE, InfrastructureError, InvalidCredentialsError,
    PasswordHasher, RepositoryError, UserAccount, UserId, ValidationError,
};
use secrecy::Secret;

use crate::{
    persistence::{save_with_retry, with_timeout},
    policy::AccountPolicy,
};

/// Error types for change password use case
#[derive(Debug, thiserror::Error)]
pub enum ChangePasswordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Account {0} not found")]
    AccountNotFound(UserId),
    #[error(transparent)]
    InvalidCredentials(#[from] InvalidCredentialsError),
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<RepositoryError> for ChangePasswordError {
    fn from(error: RepositoryError) -> Self {
        Self::Infrastructure(error.into())
    }
}

impl ChangePasswordError {
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

/// Change password use case - replaces the password after re-checking the
/// current one
pub struct ChangePasswordUseCase<R, H>
where
    R: AccountRepository,
    H: PasswordHasher,
{
    repository: R,
    hasher: H,
    policy: AccountPolicy,
}

impl<R, H> ChangePasswordUseCase<R, H>
where
    R: AccountRepository,
    H: PasswordHasher,
{
    pub fn new(repository: R, hasher: H, policy: AccountPolicy) -> Self {
        Self {
            repository,
            hasher,
            policy,
        }
    }

    /// Execute the change password use case
    ///
    /// # Arguments
    /// * `account_id` - Account whose password changes
    /// * `current_password` - Must match the stored hash; a mismatch is not
    ///   counted towards lockout
    /// * `new_password` - The new password to set
    #[tracing::instrument(
        name = "ChangePasswordUseCase::execute",
        skip(self, current_password, new_password)
    )]
    pub async fn execute(
        &self,
        account_id: UserId,
        current_password: Secret<String>,
        new_password: Secret<String>,
    ) -> Result<(), ChangePasswordError> {
        self.policy.validate_password(&new_password)?;

        let account = with_timeout(
            self.policy.repository_timeout,
            self.repository.find_by_id(&account_id),
        )
        .await?
        .ok_or(ChangePasswordError::AccountNotFound(account_id))?;

        if account.status().is_terminal() {
            return Err(InvalidCredentialsError::AccountUnavailable(account.status()).into());
        }

        if !self
            .hasher
            .verify(&current_password, account.password_hash())
            .await
        {
            return Err(InvalidCredentialsError::InvalidPassword.into());
        }

        let new_hash = self.hasher.hash(&new_password).await?;

        save_with_retry(
            &self.repository,
            &self.policy,
            account,
            |account: &mut UserAccount| -> Result<(), ChangePasswordError> {
                account.change_password_hash(new_hash.clone());
                Ok(())
            },
        )
        .await?;
        tracing::info!(account_id = %account_id, "Password changed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use secrecy::ExposeSecret;

    fn use_case(
        repository: &MockAccountRepository,
    ) -> ChangePasswordUseCase<MockAccountRepository, PlainTextHasher> {
        ChangePasswordUseCase::new(
            repository.clone(),
            PlainTextHasher::default(),
            AccountPolicy::default(),
        )
    }

    #[tokio::test]
    async fn test_change_password_success() {
        let repository = MockAccountRepository::default();
        let id = repository.insert(verified_account()).await.id();

        use_case(&repository)
            .execute(id, secret(PASSWORD), secret("NewPassword456!"))
            .await
            .unwrap();

        let stored = repository.stored(&id).await.unwrap();
        assert_eq!(
            stored.password_hash().expose_secret(),
            "hashed:NewPassword456!"
        );
    }

    #[tokio::test]
    async fn test_wrong_current_password_is_not_counted() {
        let repository = MockAccountRepository::default();
        let id = repository.insert(verified_account()).await.id();

        let result = use_case(&repository)
            .execute(id, secret("WrongPassword!"), secret("NewPassword456!"))
            .await;

        assert!(matches!(
            result,
            Err(ChangePasswordError::InvalidCredentials(
                InvalidCredentialsError::InvalidPassword
            ))
        ));
        let stored = repository.stored(&id).await.unwrap();
        assert_eq!(stored.failed_login_attempts(), 0);
        assert_eq!(repository.writes(), 0);
    }

    #[tokio::test]
    async fn test_new_password_is_validated_first() {
        let repository = MockAccountRepository::default();

        let result = use_case(&repository)
            .execute(UserId::generate(), secret(PASSWORD), secret("short"))
            .await;

        assert!(matches!(
            result,
            Err(ChangePasswordError::Validation(
                ValidationError::PasswordTooShort { min_length: 8 }
            ))
        ));
    }

    #[tokio::test]
    async fn test_change_password_user_not_found() {
        let repository = MockAccountRepository::default();
        let id = UserId::generate();

        let result = use_case(&repository)
            .execute(id, secret(PASSWORD), secret("NewPassword456!"))
            .await;

        assert!(matches!(result, Err(ChangePasswordError::AccountNotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_suspended_account_cannot_change_password() {
        let repository = MockAccountRepository::default();
        let mut account = verified_account();
        account.suspend();
        let id = repository.insert(account).await.id();

        let result = use_case(&repository)
            .execute(id, secret(PASSWORD), secret("NewPassword456!"))
            .await;

        assert!(matches!(
            result,
            Err(ChangePasswordError::InvalidCredentials(
                InvalidCredentialsError::AccountUnavailable(_)
            ))
        ));
    }
}
