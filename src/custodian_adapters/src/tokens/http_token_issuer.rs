use custodian_core::{IssuedToken, TokenIssuer, TokenIssuerError, UserId};
use reqwest::{Client, Url};
use secrecy::Secret;
use serde::{Deserialize, Serialize};

const ISSUE_BY_USER_ID_PATH: &str = "/api/v1/tokens/by-user-id";
const DEFAULT_TOKEN_TYPE: &str = "bearer";
const DEFAULT_EXPIRES_IN: u64 = 86400;

/// Asks the external token service for a bearer token on behalf of an account.
#[derive(Clone)]
pub struct HttpTokenIssuer {
    http_client: Client,
    base_url: String,
}

impl HttpTokenIssuer {
    pub fn new(base_url: String, http_client: Client) -> Self {
        Self {
            http_client,
            base_url,
        }
    }
}

#[derive(Serialize)]
struct IssueTokenRequest<'a> {
    user_id: &'a UserId,
}

#[derive(Deserialize)]
struct IssueTokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

fn default_expires_in() -> u64 {
    DEFAULT_EXPIRES_IN
}

#[async_trait::async_trait]
impl TokenIssuer for HttpTokenIssuer {
    #[tracing::instrument(name = "Requesting token from token service", skip(self))]
    async fn issue(&self, account_id: &UserId) -> Result<IssuedToken, TokenIssuerError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| TokenIssuerError::Unavailable(e.to_string()))?;
        let url = base
            .join(ISSUE_BY_USER_ID_PATH)
            .map_err(|e| TokenIssuerError::Unavailable(e.to_string()))?;

        let response = self
            .http_client
            .post(url)
            .json(&IssueTokenRequest {
                user_id: account_id,
            })
            .send()
            .await
            .map_err(|e| TokenIssuerError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TokenIssuerError::Rejected(response.status().as_u16()));
        }

        let body: IssueTokenResponse = response
            .json()
            .await
            .map_err(|e| TokenIssuerError::InvalidResponse(e.to_string()))?;

        Ok(IssuedToken {
            access_token: Secret::new(body.access_token),
            token_type: body.token_type,
            expires_in: body.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issuer(base_url: String) -> HttpTokenIssuer {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        HttpTokenIssuer::new(base_url, http_client)
    }

    #[tokio::test]
    async fn test_issue_token() {
        let mock_server = MockServer::start().await;
        let account_id = UserId::generate();

        Mock::given(method("POST"))
            .and(path(ISSUE_BY_USER_ID_PATH))
            .and(body_json(serde_json::json!({ "user_id": account_id.to_string() })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc.def.ghi",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let token = issuer(mock_server.uri()).issue(&account_id).await.unwrap();

        assert_eq!(token.access_token.expose_secret(), "abc.def.ghi");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_missing_fields_fall_back_to_defaults() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "abc" })),
            )
            .mount(&mock_server)
            .await;

        let token = issuer(mock_server.uri())
            .issue(&UserId::generate())
            .await
            .unwrap();

        assert_eq!(token.token_type, DEFAULT_TOKEN_TYPE);
        assert_eq!(token.expires_in, DEFAULT_EXPIRES_IN);
    }

    #[tokio::test]
    async fn test_error_status_is_rejected() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let result = issuer(mock_server.uri()).issue(&UserId::generate()).await;

        assert!(matches!(result, Err(TokenIssuerError::Rejected(503))));
    }

    #[tokio::test]
    async fn test_garbage_body_is_invalid() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let result = issuer(mock_server.uri()).issue(&UserId::generate()).await;

        assert!(matches!(result, Err(TokenIssuerError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let result = issuer("http://127.0.0.1:9".to_string())
            .issue(&UserId::generate())
            .await;

        assert!(matches!(result, Err(TokenIssuerError::Unavailable(_))));
    }
}
