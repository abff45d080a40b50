use custodian_application::{
    AccountPolicy, ChangePasswordError, ChangePasswordUseCase, CreateAccountError,
    CreateAccountResponse, CreateAccountUseCase, LoginError, LoginResponse, LoginUseCase,
    PasswordResetResponse, RequestPasswordResetError, RequestPasswordResetUseCase,
    VerifyEmailError, VerifyEmailResponse, VerifyEmailUseCase,
};
use custodian_core::{
    AccountRepository, EventPublisher, NotificationService, PasswordHasher, TokenIssuer, UserId,
    VerificationTokenStore,
};
use secrecy::Secret;

/// Entry point for every account operation, wired once from the concrete
/// collaborators.
pub struct AccountService<R, H, N, P, T, S>
where
    R: AccountRepository,
    H: PasswordHasher,
    N: NotificationService,
    P: EventPublisher,
    T: TokenIssuer,
    S: VerificationTokenStore,
{
    create_account: CreateAccountUseCase<R, H, N, P, S>,
    login: LoginUseCase<R, H, T>,
    verify_email: VerifyEmailUseCase<R, P, S>,
    request_password_reset: RequestPasswordResetUseCase<R, N>,
    change_password: ChangePasswordUseCase<R, H>,
}

impl<R, H, N, P, T, S> AccountService<R, H, N, P, T, S>
where
    R: AccountRepository + Clone + 'static,
    H: PasswordHasher + Clone + 'static,
    N: NotificationService + Clone + 'static,
    P: EventPublisher + Clone + 'static,
    T: TokenIssuer + 'static,
    S: VerificationTokenStore + Clone + 'static,
{
    /// Create a new AccountService from the provided collaborators
    ///
    /// # Arguments
    /// * `repository` - Account storage (must be Clone)
    /// * `hasher` - Password hashing (must be Clone)
    /// * `notifier` - Verification and reset email delivery (must be Clone)
    /// * `publisher` - Domain event sink (must be Clone)
    /// * `token_issuer` - Access token source used after a successful login
    /// * `token_store` - Remembers emailed verification tokens (must be Clone)
    /// * `policy` - Lockout, verification and timeout rules shared by every use case
    ///
    /// # Note on Architecture
    /// Collaborators implement Clone via internal Arc for thread-safe sharing.
    /// Each use case receives only the collaborators it needs.
    pub fn new(
        repository: R,
        hasher: H,
        notifier: N,
        publisher: P,
        token_issuer: T,
        token_store: S,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            create_account: CreateAccountUseCase::new(
                repository.clone(),
                hasher.clone(),
                notifier.clone(),
                publisher.clone(),
                token_store.clone(),
                policy.clone(),
            ),
            login: LoginUseCase::new(
                repository.clone(),
                hasher.clone(),
                token_issuer,
                policy.clone(),
            ),
            verify_email: VerifyEmailUseCase::new(
                repository.clone(),
                publisher,
                token_store,
                policy.clone(),
            ),
            request_password_reset: RequestPasswordResetUseCase::new(
                repository.clone(),
                notifier,
                policy.clone(),
            ),
            change_password: ChangePasswordUseCase::new(repository, hasher, policy),
        }
    }

    /// Register a new account
    ///
    /// # Arguments
    /// * `email` - Raw email address
    /// * `password` - Plaintext password, hashed before it is stored
    /// * `phone_number` - Optional phone number in international format
    pub async fn register(
        &self,
        email: &str,
        password: Secret<String>,
        phone_number: Option<&str>,
    ) -> Result<CreateAccountResponse, CreateAccountError> {
        self.create_account
            .execute(email, password, phone_number)
            .await
    }

    /// Authenticate with email and password
    ///
    /// # Returns
    /// The account snapshot plus an access token when one could be issued
    pub async fn login(
        &self,
        email: &str,
        password: Secret<String>,
    ) -> Result<LoginResponse, LoginError> {
        self.login.execute(email, password).await
    }

    /// Confirm ownership of the account's email address
    pub async fn verify_email(
        &self,
        account_id: UserId,
    ) -> Result<VerifyEmailResponse, VerifyEmailError> {
        self.verify_email.execute(account_id).await
    }

    /// Verify the account an emailed token was issued for. Each token works once.
    pub async fn confirm_email(
        &self,
        token: &str,
    ) -> Result<VerifyEmailResponse, VerifyEmailError> {
        self.verify_email.execute_with_token(token).await
    }

    /// Start a password reset; the response is identical whether or not the
    /// address belongs to an account
    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<PasswordResetResponse, RequestPasswordResetError> {
        self.request_password_reset.execute(email).await
    }

    /// Replace the password of an account after checking the current one
    ///
    /// # Arguments
    /// * `account_id` - Account whose password changes
    /// * `current_password` - Must match the stored hash
    /// * `new_password` - Subject to the same rules as at registration
    pub async fn change_password(
        &self,
        account_id: UserId,
        current_password: Secret<String>,
        new_password: Secret<String>,
    ) -> Result<(), ChangePasswordError> {
        self.change_password
            .execute(account_id, current_password, new_password)
            .await
    }
}
