use chrono::{DateTime, Utc};
use custodian_core::{
    AccountRepository, AccountStatus, EmailAddress, PersistedAccount, PhoneNumber, RepositoryError,
    UserAccount, UserId,
};
use secrecy::{ExposeSecret, Secret};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

const EMAIL_CONSTRAINT: &str = "user_accounts_email_key";
const PHONE_CONSTRAINT: &str = "user_accounts_phone_number_key";
const PRIMARY_KEY_CONSTRAINT: &str = "user_accounts_pkey";

const SELECT_COLUMNS: &str = r#"
    SELECT id, email, password_hash, phone_number, status, created_at, updated_at,
           verified_at, last_login_at, failed_login_attempts, locked_until, version
    FROM user_accounts
"#;

#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: sqlx::PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PostgresAccountRepository { pool }
    }

    async fn insert(&self, mut account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let query = sqlx::query(
            r#"
                INSERT INTO user_accounts (
                    id, email, password_hash, phone_number, status, created_at, updated_at,
                    verified_at, last_login_at, failed_login_attempts, locked_until, version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1)
            "#,
        )
        .bind(*account.id().as_uuid())
        .bind(account.email().as_str())
        .bind(account.password_hash().expose_secret())
        .bind(account.phone_number().map(PhoneNumber::as_str))
        .bind(account.status().as_str())
        .bind(account.created_at())
        .bind(account.updated_at())
        .bind(account.verified_at())
        .bind(account.last_login_at())
        .bind(attempts_column(account.failed_login_attempts()))
        .bind(account.locked_until());

        query
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &account))?;

        account.set_persisted_version(1);
        Ok(account)
    }

    async fn update(&self, mut account: UserAccount) -> Result<UserAccount, RepositoryError> {
        let expected = account.version();

        let query = sqlx::query(
            r#"
                UPDATE user_accounts
                SET email = $2,
                    password_hash = $3,
                    phone_number = $4,
                    status = $5,
                    updated_at = $6,
                    verified_at = $7,
                    last_login_at = $8,
                    failed_login_attempts = $9,
                    locked_until = $10,
                    version = version + 1
                WHERE id = $1 AND version = $11
            "#,
        )
        .bind(*account.id().as_uuid())
        .bind(account.email().as_str())
        .bind(account.password_hash().expose_secret())
        .bind(account.phone_number().map(PhoneNumber::as_str))
        .bind(account.status().as_str())
        .bind(account.updated_at())
        .bind(account.verified_at())
        .bind(account.last_login_at())
        .bind(attempts_column(account.failed_login_attempts()))
        .bind(account.locked_until())
        .bind(version_column(expected));

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &account))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::VersionConflict {
                id: account.id(),
                expected,
            });
        }

        account.set_persisted_version(expected + 1);
        Ok(account)
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        value: impl for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send + 'static,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {condition}");

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Unexpected(e.to_string()))?;

        row.map(UserAccount::try_from).transpose()
    }
}

#[async_trait::async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[tracing::instrument(name = "Saving account to PostgreSQL", skip_all, fields(account_id = %account.id()))]
    async fn save(&self, account: UserAccount) -> Result<UserAccount, RepositoryError> {
        if account.version() == 0 {
            self.insert(account).await
        } else {
            self.update(account).await
        }
    }

    #[tracing::instrument(name = "Retrieving account by id from PostgreSQL", skip_all)]
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        self.fetch_one_where("id = $1", *id.as_uuid()).await
    }

    #[tracing::instrument(name = "Retrieving account by email from PostgreSQL", skip_all)]
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        self.fetch_one_where("email = $1", email.as_str().to_string())
            .await
    }

    #[tracing::instrument(name = "Retrieving account by phone from PostgreSQL", skip_all)]
    async fn find_by_phone(
        &self,
        phone: &PhoneNumber,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        self.fetch_one_where("phone_number = $1", phone.as_str().to_string())
            .await
    }
}

fn map_write_error(error: sqlx::Error, account: &UserAccount) -> RepositoryError {
    if let Some(db_err) = error.as_database_error() {
        match db_err.constraint() {
            Some(EMAIL_CONSTRAINT) => {
                return RepositoryError::EmailAlreadyExists(account.email().to_string());
            }
            Some(PHONE_CONSTRAINT) => {
                let phone = account
                    .phone_number()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return RepositoryError::PhoneAlreadyExists(phone);
            }
            Some(PRIMARY_KEY_CONSTRAINT) => {
                return RepositoryError::VersionConflict {
                    id: account.id(),
                    expected: account.version(),
                };
            }
            _ => {}
        }
    }
    RepositoryError::Unexpected(error.to_string())
}

fn attempts_column(attempts: u32) -> i32 {
    i32::try_from(attempts).unwrap_or(i32::MAX)
}

fn version_column(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    phone_number: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    version: i64,
}

impl TryFrom<AccountRow> for UserAccount {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::Unexpected(format!("corrupt account row {}: {e}", row.id))
        };

        let email = EmailAddress::parse(&row.email).map_err(|e| corrupt(&e))?;
        let phone_number = row
            .phone_number
            .as_deref()
            .map(PhoneNumber::parse)
            .transpose()
            .map_err(|e| corrupt(&e))?;
        let status = row
            .status
            .parse::<AccountStatus>()
            .map_err(|e| corrupt(&e))?;

        Ok(UserAccount::rehydrate(PersistedAccount {
            id: UserId::from(row.id),
            email,
            password_hash: Secret::new(row.password_hash),
            phone_number,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            verified_at: row.verified_at,
            last_login_at: row.last_login_at,
            failed_login_attempts: u32::try_from(row.failed_login_attempts).unwrap_or(0),
            locked_until: row.locked_until,
            version: u64::try_from(row.version).unwrap_or(0),
        }))
    }
}
