use std::time::Duration;

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Email API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Clone)]
pub enum Mailer {
    SendGrid(SendGridClient),
    Smtp(SmtpMailer),
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mailer::SendGrid(client) => f
                .debug_struct("Mailer::SendGrid")
                .field("endpoint", &client.endpoint)
                .field("from_address", &client.from_address)
                .finish_non_exhaustive(),
            Mailer::Smtp(smtp) => f
                .debug_struct("Mailer::Smtp")
                .field("from_address", &smtp.from_address)
                .finish_non_exhaustive(),
        }
    }
}

impl Mailer {
    pub fn from_config(config: &MailConfig, timeout: Duration) -> Result<Self, MailError> {
        match config {
            MailConfig::SendGrid {
                api_key,
                from_address,
                api_base,
            } => Ok(Mailer::SendGrid(SendGridClient::new(
                api_base,
                api_key.clone(),
                from_address.clone(),
                timeout,
            )?)),
            MailConfig::Smtp {
                host,
                port,
                username,
                password,
                from_address,
            } => Ok(Mailer::Smtp(SmtpMailer::new(
                host,
                *port,
                username,
                password,
                from_address.clone(),
                timeout,
            )?)),
        }
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        match self {
            Mailer::SendGrid(client) => client.send(email).await,
            Mailer::Smtp(smtp) => smtp.send(email).await,
        }
    }
}

#[derive(Clone)]
pub struct SendGridClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    from_address: String,
}

#[derive(Serialize)]
struct SendGridAddress<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct SendGridPersonalization<'a> {
    to: Vec<SendGridAddress<'a>>,
}

#[derive(Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct SendGridMessage<'a> {
    personalizations: Vec<SendGridPersonalization<'a>>,
    from: SendGridAddress<'a>,
    subject: &'a str,
    content: Vec<SendGridContent<'a>>,
}

impl SendGridClient {
    pub fn new(
        api_base: &str,
        api_key: SecretString,
        from_address: String,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/v3/mail/send", api_base.trim_end_matches('/')),
            api_key,
            from_address,
        })
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = SendGridMessage {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress { email: &email.to }],
            }],
            from: SendGridAddress {
                email: &self.from_address,
            },
            subject: &email.subject,
            content: vec![
                SendGridContent {
                    kind: "text/plain",
                    value: &email.text,
                },
                SendGridContent {
                    kind: "text/html",
                    value: &email.html,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(status = %status, to = %email.to, "email accepted by SendGrid");
        Ok(())
    }
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &SecretString,
        from_address: String,
        timeout: Duration,
    ) -> Result<Self, MailError> {
        let credentials =
            Credentials::new(username.to_string(), password.expose_secret().to_string());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(credentials)
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            mailer,
            from_address,
        })
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| MailError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html.clone()),
                    ),
            )?;

        let response = self.mailer.send(message).await?;
        tracing::debug!(code = %response.code(), to = %email.to, "email accepted by SMTP relay");
        Ok(())
    }
}
