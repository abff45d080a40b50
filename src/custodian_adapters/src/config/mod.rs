pub mod settings;

pub use settings::{
    AccountSettings, EmailClientSettings, PostgresSettings, RedisSettings, Settings,
    TokenServiceSettings,
};
