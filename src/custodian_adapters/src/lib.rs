pub mod config;
pub mod events;
pub mod hashing;
pub mod notifications;
pub mod persistence;
pub mod tokens;

pub use config::Settings;
pub use events::{InMemoryEventBus, RedisEventPublisher};
pub use hashing::Argon2PasswordHasher;
pub use notifications::{MockNotificationService, PostmarkNotificationService};
pub use persistence::{
    HashMapAccountRepository, HashMapVerificationTokenStore, PostgresAccountRepository,
    RedisVerificationTokenStore,
};
pub use tokens::{HttpTokenIssuer, JwtTokenIssuer};
