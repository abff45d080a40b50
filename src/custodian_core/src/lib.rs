pub mod domain;
pub mod ports;

// Re-export commonly used types for convenience
pub use domain::{
    account_status::{AccountStatus, UnknownAccountStatus},
    email_address::EmailAddress,
    errors::{
        AccountStateError, ConflictError, GENERIC_CREDENTIALS_MESSAGE, GENERIC_FAILURE_MESSAGE,
        InfrastructureError, InvalidCredentialsError, ValidationError,
    },
    events::{ACCOUNT_CREATED, ACCOUNT_EMAIL_VERIFIED, AccountEvent},
    phone_number::PhoneNumber,
    user_account::{PersistedAccount, UserAccount},
    user_id::UserId,
    verification_token::VerificationToken,
};

pub use ports::{
    repositories::{AccountRepository, RepositoryError, VerificationTokenStore},
    services::{
        EventPublisher, EventPublisherError, EventSubscriber, IssuedToken, NotificationError,
        NotificationService, PasswordHasher, TokenIssuer, TokenIssuerError,
    },
};
