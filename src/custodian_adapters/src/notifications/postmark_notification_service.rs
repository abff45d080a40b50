use askama::Template;
use custodian_core::{EmailAddress, NotificationError, NotificationService, VerificationToken};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};

const MESSAGE_STREAM: &str = "outbound";
const POSTMARK_AUTH_HEADER: &str = "X-Postmark-Server-Token";

const VERIFICATION_SUBJECT: &str = "Confirm your email address";
const PASSWORD_RESET_SUBJECT: &str = "Reset your password";

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<p>Welcome!</p>
<p>Please confirm the address {{ recipient }} by following the link below:</p>
<p><a href="{{ link }}">Confirm email address</a></p>
<p>If you did not create an account you can ignore this message.</p>"#
)]
struct VerificationEmail<'a> {
    recipient: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<p>We received a request to reset the password for {{ recipient }}.</p>
<p><a href="{{ link }}">Choose a new password</a></p>
<p>If you did not ask for this, no action is needed.</p>"#
)]
struct PasswordResetEmail<'a> {
    recipient: &'a str,
    link: &'a str,
}

/// Delivers notifications through the Postmark HTTP API.
pub struct PostmarkNotificationService {
    http_client: Client,
    base_url: String,
    sender: EmailAddress,
    authorization_token: Secret<String>,
    verification_url: String,
    password_reset_url: String,
}

impl PostmarkNotificationService {
    pub fn new(
        base_url: String,
        sender: EmailAddress,
        authorization_token: Secret<String>,
        http_client: Client,
    ) -> Self {
        Self {
            http_client,
            base_url,
            sender,
            authorization_token,
            verification_url: String::new(),
            password_reset_url: String::new(),
        }
    }

    /// Pages the emailed links point at; the token and address are appended
    /// as query parameters.
    pub fn with_links(mut self, verification_url: String, password_reset_url: String) -> Self {
        self.verification_url = verification_url;
        self.password_reset_url = password_reset_url;
        self
    }

    fn link(
        page: &str,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<String, NotificationError> {
        let url = Url::parse_with_params(
            page,
            &[("token", token.as_str()), ("email", recipient.as_str())],
        )
        .map_err(|e| NotificationError::Template(format!("invalid link base '{page}': {e}")))?;
        Ok(url.to_string())
    }

    async fn send_email(
        &self,
        recipient: &EmailAddress,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), NotificationError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        let url = base
            .join("/email")
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        let request_body = SendEmailRequest {
            from: self.sender.as_str(),
            to: recipient.as_str(),
            subject,
            html_body,
            text_body,
            message_stream: MESSAGE_STREAM,
        };

        let request = self
            .http_client
            .post(url)
            .header(
                POSTMARK_AUTH_HEADER,
                self.authorization_token.expose_secret(),
            )
            .json(&request_body);

        request
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?
            .error_for_status()
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationService for PostmarkNotificationService {
    #[tracing::instrument(name = "Sending verification email", skip_all)]
    async fn send_verification_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        let link = Self::link(&self.verification_url, recipient, token)?;
        let html = VerificationEmail {
            recipient: recipient.as_str(),
            link: &link,
        }
        .render()
        .map_err(|e| NotificationError::Template(e.to_string()))?;
        let text = format!("Confirm your email address by visiting {link}");

        self.send_email(recipient, VERIFICATION_SUBJECT, &html, &text)
            .await
    }

    #[tracing::instrument(name = "Sending password reset email", skip_all)]
    async fn send_password_reset_email(
        &self,
        recipient: &EmailAddress,
        token: &VerificationToken,
    ) -> Result<(), NotificationError> {
        let link = Self::link(&self.password_reset_url, recipient, token)?;
        let html = PasswordResetEmail {
            recipient: recipient.as_str(),
            link: &link,
        }
        .render()
        .map_err(|e| NotificationError::Template(e.to_string()))?;
        let text = format!("Reset your password by visiting {link}");

        self.send_email(recipient, PASSWORD_RESET_SUBJECT, &html, &text)
            .await
    }
}

#[derive(serde::Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
    message_stream: &'a str,
}
