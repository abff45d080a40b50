use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use custodian_adapters::{
    Argon2PasswordHasher, PostgresAccountRepository, RedisEventPublisher,
    RedisVerificationTokenStore, Settings,
};
use custodian_core::UserId;
use custodian_service::{
    AccountService, build_notifier, build_token_issuer, configure_postgresql, configure_redis,
    get_postgres_pool, run_migrations,
};
use secrecy::{ExposeSecret, Secret};
use tokio::sync::RwLock;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Account registration, login and lifecycle management.
#[derive(Parser)]
#[command(name = "custodian", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Create a new account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CUSTODIAN_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Authenticate and print an access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CUSTODIAN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Mark an account's email address as verified, either from the emailed
    /// token or directly by account id
    VerifyEmail {
        #[arg(long, conflicts_with = "account_id", required_unless_present = "account_id")]
        token: Option<String>,
        #[arg(long)]
        account_id: Option<UserId>,
    },
    /// Send a password reset email
    RequestPasswordReset {
        #[arg(long)]
        email: String,
    },
    /// Replace an account's password
    ChangePassword {
        #[arg(long)]
        account_id: UserId,
        #[arg(long, env = "CUSTODIAN_PASSWORD", hide_env_values = true)]
        current_password: String,
        #[arg(long, env = "CUSTODIAN_NEW_PASSWORD", hide_env_values = true)]
        new_password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing()?;

    let cli = Cli::parse();
    let settings = Settings::load()?;

    if let Command::Migrate = cli.command {
        let pg_pool = get_postgres_pool(
            settings.postgres.url.expose_secret(),
            settings.postgres.max_connections,
        )
        .await?;
        run_migrations(&pg_pool).await?;
        tracing::info!("Migrations applied");
        return Ok(());
    }

    let pg_pool = configure_postgresql(&settings.postgres).await?;
    let redis_conn = Arc::new(RwLock::new(configure_redis(&settings.redis)?));

    let service = AccountService::new(
        PostgresAccountRepository::new(pg_pool),
        Argon2PasswordHasher::new(settings.account.password_min_length),
        build_notifier(&settings.email_client)?,
        RedisEventPublisher::new(redis_conn.clone(), settings.redis.events_key.clone()),
        build_token_issuer(&settings.token_service)?,
        RedisVerificationTokenStore::new(redis_conn),
        settings.account_policy(),
    );

    match cli.command {
        Command::Migrate => {}
        Command::Register {
            email,
            password,
            phone,
        } => {
            let created = service
                .register(&email, Secret::new(password), phone.as_deref())
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Registration failed");
                    eyre!(e.public_message())
                })?;
            println!("{} {} {}", created.account_id, created.email, created.status);
        }
        Command::Login { email, password } => {
            let login = service
                .login(&email, Secret::new(password))
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Login failed");
                    eyre!(e.public_message())
                })?;
            match login.token {
                Some(token) => println!(
                    "{} {} {}",
                    token.token_type,
                    token.access_token.expose_secret(),
                    token.expires_in
                ),
                None => println!("{} (no token issued)", login.account_id),
            }
        }
        Command::VerifyEmail { token, account_id } => {
            let result = match (token, account_id) {
                (Some(token), _) => service.confirm_email(&token).await,
                (None, Some(account_id)) => service.verify_email(account_id).await,
                (None, None) => return Err(eyre!("--token or --account-id is required")),
            };
            let verified = result.map_err(|e| {
                tracing::error!(error = %e, "Email verification failed");
                eyre!(e.public_message())
            })?;
            println!("{} {}", verified.account_id, verified.status);
        }
        Command::RequestPasswordReset { email } => {
            let reply = service.request_password_reset(&email).await.map_err(|e| {
                tracing::error!(error = %e, "Password reset request failed");
                eyre!(e.public_message())
            })?;
            println!("{}", reply.message);
        }
        Command::ChangePassword {
            account_id,
            current_password,
            new_password,
        } => {
            service
                .change_password(
                    account_id,
                    Secret::new(current_password),
                    Secret::new(new_password),
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Password change failed");
                    eyre!(e.public_message())
                })?;
            println!("Password changed");
        }
    }

    Ok(())
}

pub fn init_tracing() -> Result<()> {
    let fmt_layer = fmt::layer().compact().with_writer(std::io::stderr);

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}
