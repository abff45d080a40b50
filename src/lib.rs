//! # Custodian - Account Lifecycle Service Library
//!
//! This is a facade crate that re-exports all public APIs from the custodian components.
//! Use this crate to get access to registration, login and account lifecycle in one place.
//!
//! ## Structure
//!
//! - **Core domain types**: `EmailAddress`, `PhoneNumber`, `UserAccount`, `AccountEvent`, etc.
//! - **Ports**: `AccountRepository`, `PasswordHasher`, `NotificationService`, `EventPublisher`, `TokenIssuer`,
//!   `VerificationTokenStore`
//! - **Use cases**: `CreateAccountUseCase`, `LoginUseCase`, etc.
//! - **Adapters**: `PostgresAccountRepository`, `Argon2PasswordHasher`, `RedisEventPublisher`, etc.
//! - **Service**: `AccountService` - The main entry point for account operations

// ============================================================================
// Core Domain Types
// ============================================================================

/// Core domain types and value objects
pub mod core {
    pub use custodian_core::*;
}

// Re-export most commonly used core types at the root level
pub use custodian_core::{
    AccountEvent, AccountStatus, EmailAddress, PhoneNumber, UserAccount, UserId,
    VerificationToken,
};

// ============================================================================
// Ports
// ============================================================================

/// Repository and service trait definitions
pub mod ports {
    pub use custodian_core::{
        AccountRepository, EventPublisher, EventSubscriber, NotificationService, PasswordHasher,
        RepositoryError, TokenIssuer, VerificationTokenStore,
    };
}

pub use ports::{
    AccountRepository, EventPublisher, EventSubscriber, NotificationService, PasswordHasher,
    TokenIssuer, VerificationTokenStore,
};

// ============================================================================
// Use Cases (Application Layer)
// ============================================================================

/// Application use cases
pub mod use_cases {
    pub use custodian_application::*;
}

// Re-export use cases at root level
pub use custodian_application::{
    AccountPolicy, ChangePasswordUseCase, CreateAccountUseCase, LoginUseCase,
    RequestPasswordResetUseCase, VerifyEmailUseCase,
};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    /// Account and verification token storage
    pub mod persistence {
        pub use custodian_adapters::persistence::*;
    }

    /// Password hashing
    pub mod hashing {
        pub use custodian_adapters::hashing::*;
    }

    /// Email notification implementations
    pub mod notifications {
        pub use custodian_adapters::notifications::*;
    }

    /// Domain event publishers
    pub mod events {
        pub use custodian_adapters::events::*;
    }

    /// Access token issuers
    pub mod tokens {
        pub use custodian_adapters::tokens::*;
    }

    /// Configuration
    pub mod config {
        pub use custodian_adapters::config::*;
    }
}

// Re-export commonly used adapters at root level
pub use custodian_adapters::{
    Argon2PasswordHasher, HashMapAccountRepository, HashMapVerificationTokenStore,
    HttpTokenIssuer, InMemoryEventBus, JwtTokenIssuer, MockNotificationService,
    PostgresAccountRepository, PostmarkNotificationService, RedisEventPublisher,
    RedisVerificationTokenStore, Settings,
};

// ============================================================================
// Account Service (Main Entry Point)
// ============================================================================

/// Main account service
pub use custodian_service::{
    AccountService, configure_postgresql, configure_redis, get_redis_client,
};

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing the ports
pub use async_trait::async_trait;

/// Re-export secrecy for working with secrets
pub use secrecy::{ExposeSecret, Secret};
