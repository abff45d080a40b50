use std::sync::Arc;
use std::time::Duration;

use custodian_adapters::{
    HttpTokenIssuer, JwtTokenIssuer, MockNotificationService, PostmarkNotificationService,
    config::{EmailClientSettings, PostgresSettings, RedisSettings, TokenServiceSettings},
};
use custodian_core::{EmailAddress, NotificationService, TokenIssuer, ValidationError};
use redis::{Client, RedisResult};
use secrecy::ExposeSecret;
use sqlx::{PgPool, postgres::PgPoolOptions};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to connect to Postgres: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Failed to connect to Redis: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Invalid email sender: {0}")]
    Sender(#[from] ValidationError),
    #[error("Missing setting: {0}")]
    MissingSetting(&'static str),
}

/// Configure and return a PostgreSQL connection pool with all migrations applied
///
/// # Arguments
/// * `settings` - Postgres section of the service settings
pub async fn configure_postgresql(settings: &PostgresSettings) -> Result<PgPool, BootstrapError> {
    let pg_pool = get_postgres_pool(settings.url.expose_secret(), settings.max_connections).await?;
    run_migrations(&pg_pool).await?;
    Ok(pg_pool)
}

/// Apply every pending migration from the workspace `migrations/` directory
pub async fn run_migrations(pool: &PgPool) -> Result<(), BootstrapError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Create a PostgreSQL connection pool
///
/// # Arguments
/// * `url` - Database connection URL
/// * `max_connections` - Upper bound on pooled connections
pub async fn get_postgres_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Open a Redis connection for the event publisher
pub fn configure_redis(settings: &RedisSettings) -> Result<redis::Connection, BootstrapError> {
    Ok(get_redis_client(&settings.host_name)?.get_connection()?)
}

/// Create a Redis client
///
/// # Arguments
/// * `redis_hostname` - Redis server hostname, optionally with a port
pub fn get_redis_client(redis_hostname: &str) -> RedisResult<Client> {
    let redis_url = format!("redis://{}/", redis_hostname);
    redis::Client::open(redis_url)
}

/// Pick the notification backend: Postmark when an API token is configured,
/// otherwise the logging mock.
pub fn build_notifier(
    settings: &EmailClientSettings,
) -> Result<Arc<dyn NotificationService>, BootstrapError> {
    let Some(auth_token) = settings.auth_token.clone() else {
        tracing::warn!("No email auth token configured, notifications are only logged");
        return Ok(Arc::new(MockNotificationService::new()));
    };

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.timeout_ms))
        .build()?;
    let sender = EmailAddress::parse(&settings.sender)?;

    let notifier = PostmarkNotificationService::new(
        settings.base_url.clone(),
        sender,
        auth_token,
        http_client,
    )
    .with_links(
        settings.verification_url.clone(),
        settings.password_reset_url.clone(),
    );

    Ok(Arc::new(notifier))
}

/// Pick the token backend: the remote token service when a base URL is
/// configured, otherwise local HS256 signing.
pub fn build_token_issuer(
    settings: &TokenServiceSettings,
) -> Result<Arc<dyn TokenIssuer>, BootstrapError> {
    if let Some(base_url) = &settings.base_url {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        return Ok(Arc::new(HttpTokenIssuer::new(base_url.clone(), http_client)));
    }

    match &settings.jwt_secret {
        Some(secret) => Ok(Arc::new(JwtTokenIssuer::new(
            secret.clone(),
            settings.token_ttl_seconds,
        ))),
        None => Err(BootstrapError::MissingSetting(
            "token_service.base_url or token_service.jwt_secret",
        )),
    }
}
