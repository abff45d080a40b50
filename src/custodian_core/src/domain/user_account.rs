use chrono::{DateTime, Duration, Utc};
use secrecy::Secret;

use crate::domain::{
    account_status::AccountStatus, email_address::EmailAddress, errors::AccountStateError,
    events::AccountEvent, phone_number::PhoneNumber, user_id::UserId,
};

/// Flat storage representation of an account, used by repository adapters to
/// move an aggregate in and out of a backing store.
#[derive(Debug, Clone)]
pub struct PersistedAccount {
    pub id: UserId,
    pub email: EmailAddress,
    pub password_hash: Secret<String>,
    pub phone_number: Option<PhoneNumber>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub version: u64,
}

/// User account aggregate.
///
/// Every state change goes through a method on this type; the fields are never
/// touched directly. Methods that represent a state change worth announcing queue
/// an [`AccountEvent`], which stays on the aggregate until [`take_events`] drains
/// it. The event buffer is not part of the persisted state.
///
/// [`take_events`]: UserAccount::take_events
#[derive(Debug, Clone)]
pub struct UserAccount {
    id: UserId,
    email: EmailAddress,
    password_hash: Secret<String>,
    phone_number: Option<PhoneNumber>,
    status: AccountStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    failed_login_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    /// Optimistic concurrency token; 0 until the first successful save.
    version: u64,
    events: Vec<AccountEvent>,
}

impl UserAccount {
    /// Create a brand new account awaiting email verification.
    pub fn create(
        email: EmailAddress,
        password_hash: Secret<String>,
        phone_number: Option<PhoneNumber>,
    ) -> Self {
        let id = UserId::generate();
        let now = Utc::now();

        let mut account = Self {
            id,
            email: email.clone(),
            password_hash,
            phone_number: phone_number.clone(),
            status: AccountStatus::PendingVerification,
            created_at: now,
            updated_at: now,
            verified_at: None,
            last_login_at: None,
            failed_login_attempts: 0,
            locked_until: None,
            version: 0,
            events: Vec::new(),
        };
        account.add_event(AccountEvent::account_created(id, email, phone_number, now));
        account
    }

    /// Rebuild an aggregate from storage. No events are pending afterwards.
    pub fn rehydrate(record: PersistedAccount) -> Self {
        Self {
            id: record.id,
            email: record.email,
            password_hash: record.password_hash,
            phone_number: record.phone_number,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            verified_at: record.verified_at,
            last_login_at: record.last_login_at,
            failed_login_attempts: record.failed_login_attempts,
            locked_until: record.locked_until,
            version: record.version,
            events: Vec::new(),
        }
    }

    pub fn to_persisted(&self) -> PersistedAccount {
        PersistedAccount {
            id: self.id,
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            phone_number: self.phone_number.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            verified_at: self.verified_at,
            last_login_at: self.last_login_at,
            failed_login_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
            version: self.version,
        }
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Mark the email as verified. Returns `false` (and changes nothing) unless
    /// the account is awaiting verification.
    pub fn verify_email(&mut self) -> bool {
        if self.status != AccountStatus::PendingVerification {
            return false;
        }

        let now = Utc::now();
        self.status = AccountStatus::Active;
        self.verified_at = Some(now);
        self.updated_at = now;
        self.add_event(AccountEvent::email_verified(self.id, self.email.clone(), now));
        true
    }

    pub fn is_email_verified(&self) -> bool {
        self.verified_at.is_some()
    }

    // ------------------------------------------------------------------
    // Login policy
    // ------------------------------------------------------------------

    pub fn can_login(&self) -> bool {
        self.status.can_login() && !self.is_locked()
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked_at(Utc::now())
    }

    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Count a failed password attempt, locking the account for
    /// `lockout_duration` once `max_attempts` is reached.
    pub fn record_failed_login(&mut self, max_attempts: u32, lockout_duration: Duration) {
        let now = Utc::now();
        self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
        self.updated_at = now;

        if self.failed_login_attempts >= max_attempts.max(1) {
            self.locked_until = Some(
                now.checked_add_signed(lockout_duration)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            );
        }
    }

    pub fn record_successful_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
        self.failed_login_attempts = 0;
        self.locked_until = None;
    }

    /// Administrative unlock: forgets previous failures and lifts any lockout.
    pub fn unlock(&mut self) {
        self.failed_login_attempts = 0;
        self.locked_until = None;
        self.updated_at = Utc::now();
    }

    // ------------------------------------------------------------------
    // Status transitions
    // ------------------------------------------------------------------

    pub fn deactivate(&mut self) {
        if matches!(
            self.status,
            AccountStatus::PendingVerification | AccountStatus::Active
        ) {
            self.transition_to(AccountStatus::Inactive);
        }
    }

    /// Verified accounts come back as active, unverified ones go back to
    /// awaiting verification.
    pub fn reactivate(&mut self) {
        if self.status != AccountStatus::Inactive {
            return;
        }
        let next = if self.is_email_verified() {
            AccountStatus::Active
        } else {
            AccountStatus::PendingVerification
        };
        self.transition_to(next);
    }

    pub fn suspend(&mut self) {
        if !self.status.is_terminal() {
            self.transition_to(AccountStatus::Suspended);
        }
    }

    pub fn mark_deleted(&mut self) {
        if !self.status.is_terminal() {
            self.transition_to(AccountStatus::Deleted);
        }
    }

    fn transition_to(&mut self, status: AccountStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    /// Replace the email address. The new address has to be verified again.
    pub fn change_email(&mut self, new_email: EmailAddress) -> Result<(), AccountStateError> {
        if self.status.is_terminal() {
            return Err(AccountStateError::Immutable(self.status));
        }
        if new_email == self.email {
            return Ok(());
        }

        self.email = new_email;
        self.status = AccountStatus::PendingVerification;
        self.verified_at = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn change_password_hash(&mut self, password_hash: Secret<String>) {
        self.password_hash = password_hash;
        self.updated_at = Utc::now();
    }

    // ------------------------------------------------------------------
    // Events and persistence bookkeeping
    // ------------------------------------------------------------------

    fn add_event(&mut self, event: AccountEvent) {
        self.events.push(event);
    }

    pub fn pending_events(&self) -> &[AccountEvent] {
        &self.events
    }

    /// Drain all pending events, leaving the buffer empty.
    pub fn take_events(&mut self) -> Vec<AccountEvent> {
        std::mem::take(&mut self.events)
    }

    /// Called by repositories after a successful write.
    pub fn set_persisted_version(&mut self, version: u64) {
        self.version = version;
    }

    // Getters
    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn password_hash(&self) -> &Secret<String> {
        &self.password_hash
    }

    pub fn phone_number(&self) -> Option<&PhoneNumber> {
        self.phone_number.as_ref()
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }

    pub fn failed_login_attempts(&self) -> u32 {
        self.failed_login_attempts
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.locked_until
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}
