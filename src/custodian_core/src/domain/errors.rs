//! Error taxonomy shared by every use case.
//!
//! Each family carries its own disclosure rule: validation and conflict errors
//! are safe to show verbatim, credential errors collapse to one generic message
//! (except lockout), and infrastructure errors are logged in full but surfaced
//! generically.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::account_status::AccountStatus;

pub const GENERIC_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const GENERIC_FAILURE_MESSAGE: &str = "An internal error occurred, please try again";

/// Malformed input. The caller's fault, safe to surface verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Email is required")]
    EmptyEmail,
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Password is required")]
    EmptyPassword,
    #[error("Password must be at least {min_length} characters long")]
    PasswordTooShort { min_length: usize },
    #[error("Phone number cannot be empty")]
    EmptyPhoneNumber,
    #[error("Invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error("Verification token is malformed")]
    InvalidVerificationToken,
    #[error("Failed to hash password: {0}")]
    PasswordHashing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("User with email '{0}' already exists")]
    EmailAlreadyExists(String),
    #[error("User with phone '{0}' already exists")]
    PhoneAlreadyExists(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCredentialsError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Account is temporarily locked due to too many failed login attempts")]
    AccountLocked { locked_until: Option<DateTime<Utc>> },
    #[error("Account status does not allow login: {0}")]
    AccountUnavailable(AccountStatus),
}

impl InvalidCredentialsError {
    /// Lockout reveals nothing about which credential was wrong, so it is the
    /// only variant disclosed as-is.
    pub fn public_message(&self) -> String {
        match self {
            Self::AccountLocked { .. } => self.to_string(),
            _ => GENERIC_CREDENTIALS_MESSAGE.to_string(),
        }
    }
}

/// Storage, network or timeout failure. Always retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InfrastructureError {
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("Repository failure: {0}")]
    Repository(String),
    #[error("Gave up after {attempts} conflicting concurrent updates")]
    ConcurrentModification { attempts: u32 },
    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),
}

/// Raised by aggregate methods that refuse to touch a sink-state account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountStateError {
    #[error("Account in status '{0}' can no longer be modified")]
    Immutable(AccountStatus),
}
