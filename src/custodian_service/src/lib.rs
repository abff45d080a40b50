mod account_service;
mod helpers;

pub use account_service::AccountService;
pub use helpers::{
    BootstrapError, build_notifier, build_token_issuer, configure_postgresql, configure_redis,
    get_postgres_pool, get_redis_client, run_migrations,
};
