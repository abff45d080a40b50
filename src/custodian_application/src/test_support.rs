//! Hand-written collaborators shared by the use case tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use custodian_core::{
    AccountEvent, AccountRepository, EmailAddress, EventPublisher, EventPublisherError,
    IssuedToken, NotificationError, NotificationService, PasswordHasher, PersistedAccount,
    PhoneNumber, RepositoryError, TokenIssuer, TokenIssuerError, UserAccount, UserId,
    ValidationError, VerificationToken, VerificationTokenStore,
};
use secrecy::{ExposeSecret, Secret};
use tokio::sync::RwLock;

pub const EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "Password123!";

pub fn secret(value: &str) -> Secret<String> {
    Secret::new(value.to_string())
}

pub fn sample_account() -> UserAccount {
    let mut account = UserAccount::create(
        EmailAddress::parse(EMAIL).unwrap(),
        secret(&format!("hashed:{PASSWORD}")),
        None,
    );
    account.take_events();
    account
}

pub fn verified_account() -> UserAccount {
    let mut account = sample_account();
    account.verify_email();
    account.take_events();
    account
}

// ----------------------------------------------------------------------------
// Repository
// ----------------------------------------------------------------------------

type Interference = Box<dyn FnOnce(&mut UserAccount) + Send>;

#[derive(Clone, Default)]
pub struct MockAccountRepository {
    accounts: Arc<RwLock<HashMap<UserId, PersistedAccount>>>,
    interference: Arc<Mutex<Option<Interference>>>,
    pending_conflicts: Arc<AtomicU32>,
    writes: Arc<AtomicU32>,
    lookup_delay: Option<Duration>,
}

impl MockAccountRepository {
    pub fn with_lookup_delay(delay: Duration) -> Self {
        Self {
            lookup_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Store an account directly, returning the persisted copy without events.
    pub async fn insert(&self, account: UserAccount) -> UserAccount {
        let mut saved = self.save(account).await.unwrap();
        saved.take_events();
        self.writes.store(0, Ordering::SeqCst);
        saved
    }

    /// Make the next `count` saves fail as if another writer got there first.
    pub fn inject_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    /// Let another writer change the stored account just before the next
    /// save lands, so that save loses the version race.
    pub fn interfere_on_next_save(&self, change: impl FnOnce(&mut UserAccount) + Send + 'static) {
        *self.interference.lock().unwrap() = Some(Box::new(change));
    }

    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn stored(&self, id: &UserId) -> Option<UserAccount> {
        self.accounts
            .read()
            .await
            .get(id)
            .cloned()
            .map(UserAccount::rehydrate)
    }

    async fn delay(&self) {
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl AccountRepository for MockAccountRepository {
    async fn save(&self, mut account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let interference = self.interference.lock().unwrap().take();
        if let Some(change) = interference {
            let mut accounts = self.accounts.write().await;
            if let Some(stored) = accounts.get(&account.id()).cloned() {
                let mut other = UserAccount::rehydrate(stored);
                change(&mut other);
                let version = other.version() + 1;
                other.set_persisted_version(version);
                accounts.insert(other.id(), other.to_persisted());
            }
        }

        let conflict = self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflict {
            return Err(RepositoryError::VersionConflict {
                id: account.id(),
                expected: account.version(),
            });
        }

        let mut accounts = self.accounts.write().await;
        let current = accounts.get(&account.id()).map_or(0, |a| a.version);
        if current != account.version() {
            return Err(RepositoryError::VersionConflict {
                id: account.id(),
                expected: account.version(),
            });
        }
        if accounts
            .values()
            .any(|a| a.id != account.id() && &a.email == account.email())
        {
            return Err(RepositoryError::EmailAlreadyExists(account.email().to_string()));
        }
        if let Some(phone) = account.phone_number()
            && accounts
                .values()
                .any(|a| a.id != account.id() && a.phone_number.as_ref() == Some(phone))
        {
            return Err(RepositoryError::PhoneAlreadyExists(phone.to_string()));
        }

        account.set_persisted_version(current + 1);
        accounts.insert(account.id(), account.to_persisted());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(account)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.delay().await;
        Ok(self.stored(id).await)
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        self.delay().await;
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| &a.email == email)
            .cloned()
            .map(UserAccount::rehydrate))
    }

    async fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        self.delay().await;
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|a| a.phone_number.as_ref() == Some(phone))
            .cloned()
            .map(UserAccount::rehydrate))
    }
}

// ----------------------------------------------------------------------------
// Verification tokens
// ----------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockTokenStore {
    tokens: Arc<RwLock<HashMap<String, UserId>>>,
    pub fail: bool,
}

impl MockTokenStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn insert(&self, token: &VerificationToken, account_id: UserId) {
        self.tokens
            .write()
            .await
            .insert(token.as_str().to_string(), account_id);
    }

    /// The outstanding token issued for `account_id`, if any.
    pub async fn token_for(&self, account_id: &UserId) -> Option<VerificationToken> {
        self.tokens
            .read()
            .await
            .iter()
            .find(|(_, id)| *id == account_id)
            .map(|(token, _)| VerificationToken::parse(token).unwrap())
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait::async_trait]
impl VerificationTokenStore for MockTokenStore {
    async fn store(
        &self,
        token: &VerificationToken,
        account_id: UserId,
        _ttl: Duration,
    ) -> Result<(), RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Unexpected("token store offline".into()));
        }
        self.insert(token, account_id).await;
        Ok(())
    }

    async fn consume(&self, token: &VerificationToken) -> Result<Option<UserId>, RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Unexpected("token store offline".into()));
        }
        Ok(self.tokens.write().await.remove(token.as_str()))
    }
}

// ----------------------------------------------------------------------------
// Hasher
// ----------------------------------------------------------------------------

/// Prefixes the password instead of hashing it.
#[derive(Clone, Default)]
pub struct PlainTextHasher {
    pub fail: bool,
}

#[async_trait::async_trait]
impl PasswordHasher for PlainTextHasher {
    async fn hash(&self, password: &Secret<String>) -> Result<Secret<String>, ValidationError> {
        if password.expose_secret().is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        if self.fail {
            return Err(ValidationError::PasswordHashing("hasher offline".into()));
        }
        Ok(secret(&format!("hashed:{}", password.expose_secret())))
    }

    async fn verify(&self, password: &Secret<String>, password_hash: &Secret<String>) -> bool {
        password_hash.expose_secret() == &format!("hashed:{}", password.expose_secret())
    }
}

// ----------------------------------------------------------------------------
// Notifications
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    Verification(String),
    PasswordReset(String),
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<RwLock<Vec<SentNotification>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    async fn record(&self, notification: SentNotification) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Delivery("smtp down".into()));
        }
        self.sent.write().await.push(notification);
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationService for RecordingNotifier {
    async fn send_verification_email(
        &self,
        recipient: &EmailAddress,
        _token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        self.record(SentNotification::Verification(recipient.to_string()))
            .await
    }

    async fn send_password_reset_email(
        &self,
        recipient: &EmailAddress,
        _token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        self.record(SentNotification::PasswordReset(recipient.to_string()))
            .await
    }
}

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingPublisher {
    pub events: Arc<RwLock<Vec<AccountEvent>>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn event_types(&self) -> Vec<&'static str> {
        self.events
            .read()
            .await
            .iter()
            .map(AccountEvent::event_type)
            .collect()
    }
}

#[async_trait::async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &AccountEvent) -> Result<(), EventPublisherError> {
        if self.fail {
            return Err(EventPublisherError::Transport("broker down".into()));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tokens
// ----------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct StubTokenIssuer {
    pub fail: bool,
}

#[async_trait::async_trait]
impl TokenIssuer for StubTokenIssuer {
    async fn issue(&self, account_id: &UserId) -> Result<IssuedToken, TokenIssuerError> {
        if self.fail {
            return Err(TokenIssuerError::Unavailable("connection refused".into()));
        }
        Ok(IssuedToken {
            access_token: secret(&format!("token-for-{account_id}")),
            token_type: "bearer".to_string(),
            expires_in: 86400,
        })
    }
}
