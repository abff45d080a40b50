use std::collections::HashMap;
use std::sync::Arc;

use custodian_core::{
    AccountRepository, EmailAddress, PersistedAccount, PhoneNumber, RepositoryError,
    UserAccount, UserId,
};
use tokio::sync::RwLock;

/// In-process account store.
///
/// The version check and the uniqueness checks run under the same write lock,
/// so concurrent saves behave like the unique constraints and the
/// `WHERE version = $n` guard of the Postgres store.
#[derive(Default, Clone)]
pub struct HashMapAccountRepository {
    accounts: Arc<RwLock<HashMap<UserId, PersistedAccount>>>,
}

impl HashMapAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl AccountRepository for HashMapAccountRepository {
    async fn save(&self, mut account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let mut accounts = self.accounts.write().await;

        let stored_version = accounts.get(&account.id()).map_or(0, |stored| stored.version);
        if stored_version != account.version() {
            return Err(RepositoryError::VersionConflict {
                id: account.id(),
                expected: account.version(),
            });
        }

        for other in accounts.values().filter(|other| other.id != account.id()) {
            if &other.email == account.email() {
                return Err(RepositoryError::EmailAlreadyExists(
                    account.email().to_string(),
                ));
            }
            if let (Some(mine), Some(theirs)) = (account.phone_number(), &other.phone_number)
                && mine == theirs
            {
                return Err(RepositoryError::PhoneAlreadyExists(mine.to_string()));
            }
        }

        account.set_persisted_version(stored_version + 1);
        accounts.insert(account.id(), account.to_persisted());
        tracing::debug!(account_id = %account.id(), version = account.version(), "Saved account");

        Ok(account)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(id).cloned().map(UserAccount::rehydrate))
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|stored| &stored.email == email)
            .cloned()
            .map(UserAccount::rehydrate))
    }

    async fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|stored| stored.phone_number.as_ref() == Some(phone))
            .cloned()
            .map(UserAccount::rehydrate))
    }
}
