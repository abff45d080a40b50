use chrono::Utc;
use custodian_core::{IssuedToken, TokenIssuer, TokenIssuerError, UserId};
use jsonwebtoken::{EncodingKey, Header, encode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signs HS256 bearer tokens in-process, for deployments without a separate
/// token service.
#[derive(Clone)]
pub struct JwtTokenIssuer {
    secret: Secret<String>,
    token_ttl_seconds: u64,
}

impl JwtTokenIssuer {
    pub fn new(secret: Secret<String>, token_ttl_seconds: u64) -> Self {
        Self {
            secret,
            token_ttl_seconds,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[async_trait::async_trait]
impl TokenIssuer for JwtTokenIssuer {
    #[tracing::instrument(name = "Signing access token", skip(self))]
    async fn issue(&self, account_id: &UserId) -> Result<IssuedToken, TokenIssuerError> {
        let ttl = i64::try_from(self.token_ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| TokenIssuerError::Signing("token lifetime out of range".to_string()))?;

        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| TokenIssuerError::Signing("Duration out of range".to_string()))?
            .timestamp();

        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| TokenIssuerError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            access_token: Secret::new(token),
            token_type: "bearer".to_string(),
            expires_in: self.token_ttl_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

    const SECRET: &str = "test-signing-secret";

    #[tokio::test]
    async fn test_token_carries_account_id() {
        let issuer = JwtTokenIssuer::new(Secret::new(SECRET.to_string()), 600);
        let account_id = UserId::generate();

        let token = issuer.issue(&account_id).await.unwrap();

        let claims = decode::<Claims>(
            token.access_token.expose_secret(),
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap()
        .claims;

        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.exp - claims.iat, 600);
        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 600);
    }

    #[tokio::test]
    async fn test_wrong_secret_fails_validation() {
        let issuer = JwtTokenIssuer::new(Secret::new(SECRET.to_string()), 600);
        let token = issuer.issue(&UserId::generate()).await.unwrap();

        let result = decode::<Claims>(
            token.access_token.expose_secret(),
            &DecodingKey::from_secret(b"another-secret"),
            &Validation::new(Algorithm::HS256),
        );

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_each_token_is_unique() {
        let issuer = JwtTokenIssuer::new(Secret::new(SECRET.to_string()), 600);
        let account_id = UserId::generate();

        let first = issuer.issue(&account_id).await.unwrap();
        let second = issuer.issue(&account_id).await.unwrap();

        assert_ne!(
            first.access_token.expose_secret(),
            second.access_token.expose_secret()
        );
    }
}
