use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
    password_hash::{PasswordHasher as _, SaltString, rand_core},
};
use custodian_core::{PasswordHasher, ValidationError};
use secrecy::{ExposeSecret, Secret};

/// Argon2id (v0x13) hasher. Work runs on the blocking pool inside the caller's span.
#[derive(Debug, Clone)]
pub struct Argon2PasswordHasher {
    params: Params,
    min_length: usize,
}

impl Default for Argon2PasswordHasher {
    /// m = 19456 KiB, t = 2, p = 1
    fn default() -> Self {
        Self {
            params: Params::default(),
            min_length: 8,
        }
    }
}

impl Argon2PasswordHasher {
    pub fn new(min_length: usize) -> Self {
        Self {
            min_length,
            ..Self::default()
        }
    }

    pub fn with_params(params: Params, min_length: usize) -> Self {
        Self { params, min_length }
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }
}

#[async_trait::async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    #[tracing::instrument(name = "Computing password hash", skip_all)]
    async fn hash(&self, password: &Secret<String>) -> Result<Secret<String>, ValidationError> {
        if password.expose_secret().is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        if password.expose_secret().chars().count() < self.min_length {
            return Err(ValidationError::PasswordTooShort {
                min_length: self.min_length,
            });
        }

        let password = password.clone();
        let params = self.params.clone();
        let current_span: tracing::Span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            current_span.in_scope(move || {
                let salt: SaltString = SaltString::generate(rand_core::OsRng);
                Self::argon2(params)
                    .hash_password(password.expose_secret().as_bytes(), &salt)
                    .map(|h| Secret::new(h.to_string()))
                    .map_err(|e| ValidationError::PasswordHashing(e.to_string()))
            })
        })
        .await
        .map_err(|e| ValidationError::PasswordHashing(e.to_string()))?
    }

    #[tracing::instrument(name = "Verify password hash", skip_all)]
    async fn verify(&self, password: &Secret<String>, password_hash: &Secret<String>) -> bool {
        let password = password.clone();
        let password_hash = password_hash.clone();
        let params = self.params.clone();
        let current_span: tracing::Span = tracing::Span::current();

        let result = tokio::task::spawn_blocking(move || {
            current_span.in_scope(|| {
                let expected = PasswordHash::new(password_hash.expose_secret())
                    .map_err(|e| e.to_string())?;

                Self::argon2(params)
                    .verify_password(password.expose_secret().as_bytes(), &expected)
                    .map_err(|e| e.to_string())
            })
        })
        .await;

        match result {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Password did not verify");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> Argon2PasswordHasher {
        Argon2PasswordHasher::with_params(Params::new(8, 1, 1, None).unwrap(), 8)
    }

    fn secret(value: &str) -> Secret<String> {
        Secret::new(value.to_string())
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = fast_hasher();

        let hash = hasher.hash(&secret("Password123!")).await.unwrap();

        assert!(hash.expose_secret().starts_with("$argon2id$v=19$"));
        assert!(hasher.verify(&secret("Password123!"), &hash).await);
        assert!(!hasher.verify(&secret("Password124!"), &hash).await);
    }

    #[tokio::test]
    async fn test_salts_differ() {
        let hasher = fast_hasher();

        let first = hasher.hash(&secret("Password123!")).await.unwrap();
        let second = hasher.hash(&secret("Password123!")).await.unwrap();

        assert_ne!(first.expose_secret(), second.expose_secret());
    }

    #[tokio::test]
    async fn test_short_and_empty_passwords_are_rejected() {
        let hasher = fast_hasher();

        assert_eq!(
            hasher.hash(&secret("")).await.unwrap_err(),
            ValidationError::EmptyPassword
        );
        assert_eq!(
            hasher.hash(&secret("1234567")).await.unwrap_err(),
            ValidationError::PasswordTooShort { min_length: 8 }
        );
    }

    #[tokio::test]
    async fn test_malformed_hash_does_not_verify() {
        let hasher = fast_hasher();

        assert!(!hasher.verify(&secret("Password123!"), &secret("not-a-phc-string")).await);
        assert!(!hasher.verify(&secret("Password123!"), &secret("")).await);
    }

    #[test]
    fn test_default_parameters() {
        let hasher = Argon2PasswordHasher::default();
        assert_eq!(hasher.params.m_cost(), 19456);
        assert_eq!(hasher.params.t_cost(), 2);
        assert_eq!(hasher.params.p_cost(), 1);
    }
}
