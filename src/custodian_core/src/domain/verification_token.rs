use std::fmt;

use rand::{Rng, distr::Alphanumeric};

use crate::domain::errors::ValidationError;

const TOKEN_LENGTH: usize = 32;

/// Random single-use token embedded in verification and password-reset links.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationToken(String);

impl VerificationToken {
    pub fn generate() -> Self {
        let token = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Accept a token coming back from an emailed link.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.len() != TOKEN_LENGTH || !raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidVerificationToken);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VerificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationToken([REDACTED])")
    }
}

impl AsRef<str> for VerificationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
