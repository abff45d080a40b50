pub mod hashmap_account_repository;
pub mod hashmap_verification_token_store;
pub mod postgres_account_repository;
pub mod redis_verification_token_store;

pub use hashmap_account_repository::HashMapAccountRepository;
pub use hashmap_verification_token_store::HashMapVerificationTokenStore;
pub use postgres_account_repository::PostgresAccountRepository;
pub use redis_verification_token_store::RedisVerificationTokenStore;
