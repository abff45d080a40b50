use chrono::{DateTime, Utc};
use custodian_core::{
    AccountRepository, AccountStatus, ConflictError, EmailAddress, EventPublisher,
    GENERIC_FAILURE_MESSAGE, InfrastructureError, NotificationService, PasswordHasher,
    PhoneNumber, RepositoryError, UserAccount, UserId, ValidationError, VerificationToken,
    VerificationTokenStore,
};
use secrecy::Secret;

use crate::{persistence::with_timeout, policy::AccountPolicy};

/// Response from create account use case
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAccountResponse {
    pub account_id: UserId,
    pub email: EmailAddress,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// Error types for create account use case
#[derive(Debug, thiserror::Error)]
pub enum CreateAccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<RepositoryError> for CreateAccountError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::EmailAlreadyExists(email) => {
                ConflictError::EmailAlreadyExists(email).into()
            }
            RepositoryError::PhoneAlreadyExists(phone) => {
                ConflictError::PhoneAlreadyExists(phone).into()
            }
            other => InfrastructureError::from(other).into(),
        }
    }
}

impl CreateAccountError {
    pub fn public_message(&self) -> String {
        match self {
            Self::Infrastructure(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }
}

/// Create account use case - registers a new account awaiting email verification
pub struct CreateAccountUseCase<R, H, N, P, S>
where
    R: AccountRepository,
    H: PasswordHasher,
    N: NotificationService,
    P: EventPublisher,
    S: VerificationTokenStore,
{
    repository: R,
    hasher: H,
    notifier: N,
    publisher: P,
    token_store: S,
    policy: AccountPolicy,
}

impl<R, H, N, P, S> CreateAccountUseCase<R, H, N, P, S>
where
    R: AccountRepository,
    H: PasswordHasher,
    N: NotificationService,
    P: EventPublisher,
    S: VerificationTokenStore,
{
    pub fn new(
        repository: R,
        hasher: H,
        notifier: N,
        publisher: P,
        token_store: S,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            repository,
            hasher,
            notifier,
            publisher,
            token_store,
            policy,
        }
    }

    /// Execute the create account use case
    ///
    /// # Arguments
    /// * `email` - Raw email address as typed by the user
    /// * `password` - Plain text password
    /// * `phone_number` - Optional raw phone number; blank input counts as absent
    ///
    /// # Returns
    /// The new account's identity, or CreateAccountError. Nothing is persisted
    /// when an error is returned.
    #[tracing::instrument(name = "CreateAccountUseCase::execute", skip(self, password))]
    pub async fn execute(
        &self,
        email: &str,
        password: Secret<String>,
        phone_number: Option<&str>,
    ) -> Result<CreateAccountResponse, CreateAccountError> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        self.policy.validate_password(&password)?;

        let email = EmailAddress::parse(email)?;
        let phone_number = phone_number
            .filter(|raw| !raw.trim().is_empty())
            .map(PhoneNumber::parse)
            .transpose()?;

        self.ensure_unique(&email, phone_number.as_ref()).await?;

        let password_hash = self.hasher.hash(&password).await?;
        let account = UserAccount::create(email, password_hash, phone_number);

        let mut account = with_timeout(
            self.policy.repository_timeout,
            self.repository.save(account),
        )
        .await?;
        tracing::info!(account_id = %account.id(), "Account created");

        self.send_verification(&account).await;

        let events = account.take_events();
        if let Err(e) = self.publisher.publish_batch(&events).await {
            tracing::error!(account_id = %account.id(), error = %e, "Failed to publish account events");
        }

        Ok(CreateAccountResponse {
            account_id: account.id(),
            email: account.email().clone(),
            status: account.status(),
            created_at: account.created_at(),
        })
    }

    /// Best effort. Nothing is sent when the token cannot be stored.
    async fn send_verification(&self, account: &UserAccount) {
        let token = VerificationToken::generate();

        let stored = with_timeout(
            self.policy.repository_timeout,
            self.token_store
                .store(&token, account.id(), self.policy.verification_token_ttl),
        )
        .await;
        if let Err(e) = stored {
            tracing::warn!(account_id = %account.id(), error = %e, "Failed to store verification token");
            return;
        }

        if let Err(e) = self
            .notifier
            .send_verification_email(account.email(), &token)
            .await
        {
            tracing::warn!(account_id = %account.id(), error = %e, "Failed to send verification email");
        }
    }

    async fn ensure_unique(
        &self,
        email: &EmailAddress,
        phone_number: Option<&PhoneNumber>,
    ) -> Result<(), CreateAccountError> {
        let timeout = self.policy.repository_timeout;

        if with_timeout(timeout, self.repository.find_by_email(email))
            .await?
            .is_some()
        {
            return Err(ConflictError::EmailAlreadyExists(email.to_string()).into());
        }

        if let Some(phone) = phone_number
            && with_timeout(timeout, self.repository.find_by_phone(phone))
                .await?
                .is_some()
        {
            return Err(ConflictError::PhoneAlreadyExists(phone.to_string()).into());
        }

        Ok(())
    }
}
