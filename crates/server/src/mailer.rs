//! Outbound mail transports for digest delivery.

use std::sync::Arc;

use async_trait::async_trait;
use fleetpulse_core::config::{MailConfig, MailTransport};
use fleetpulse_core::errors::ApplicationError;
use fleetpulse_core::notifications::ports::{Mailer, OutboundEmail};
use reqwest::Client;
use serde::Serialize;
use tracing::info;

const MAX_ERROR_BODY_CHARS: usize = 256;

/// Picks the transport named by `mail.transport`. The HTTP transport needs an
/// API key; without one this is a configuration error.
pub fn from_config(
    config: &MailConfig,
    client: Client,
) -> Result<Arc<dyn Mailer>, ApplicationError> {
    match config.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer::new(&config.from_address))),
        MailTransport::Http => {
            let api_key = config.api_key().ok_or_else(|| {
                ApplicationError::Configuration(
                    "mail.api_key is required when mail.transport = \"http\"".to_string(),
                )
            })?;
            Ok(Arc::new(HttpMailer::new(
                client,
                &config.api_base_url,
                api_key,
                &config.from_address,
            )))
        }
    }
}

/// Sends through a JSON email API (`POST {base}/emails`).
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(client: Client, api_base_url: &str, api_key: &str, from: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/emails", api_base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ApplicationError> {
        let payload = SendEmailRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ApplicationError::Integration(format!("mail api request failed: {error}"))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        Err(ApplicationError::Integration(format!("mail api returned {status}: {body}")))
    }
}

/// Writes each digest to the log and reports it as delivered.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: &str) -> Self {
        Self { from: from.to_string() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ApplicationError> {
        info!(
            event_name = "digest.mail.logged",
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "digest email logged instead of sent"
        );
        Ok(())
    }
}
