use std::time::Duration;

use custodian_core::ValidationError;
use secrecy::{ExposeSecret, Secret};

/// Account-security knobs injected into every use case.
#[derive(Debug, Clone)]
pub struct AccountPolicy {
    pub password_min_length: usize,
    pub max_login_attempts: u32,
    pub lockout_duration: chrono::Duration,
    pub require_email_verification: bool,
    /// Upper bound for every single repository call.
    pub repository_timeout: Duration,
    /// How many times a save is re-applied after a version conflict.
    pub max_conflict_retries: u32,
    /// When set, a failed token request fails the whole login instead of
    /// returning a response without a token.
    pub strict_token_issuance: bool,
    /// How long an emailed verification link stays usable.
    pub verification_token_ttl: Duration,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            password_min_length: 8,
            max_login_attempts: 5,
            lockout_duration: chrono::Duration::minutes(15),
            require_email_verification: true,
            repository_timeout: Duration::from_secs(5),
            max_conflict_retries: 16,
            strict_token_issuance: false,
            verification_token_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl AccountPolicy {
    pub fn validate_password(&self, password: &Secret<String>) -> Result<(), ValidationError> {
        let password = password.expose_secret();
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        if password.chars().count() < self.password_min_length {
            return Err(ValidationError::PasswordTooShort {
                min_length: self.password_min_length,
            });
        }
        Ok(())
    }
}
