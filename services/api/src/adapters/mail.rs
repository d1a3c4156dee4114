//! services/api/src/adapters/mail.rs
//!
//! Implementations of the `MailService` port: an HTTP relay client for a
//! transactional mail API, and a log-only fallback for local runs.

use async_trait::async_trait;
use docchat_core::{
    ports::{MailService, PortError, PortResult},
    OutgoingEmail,
};
use serde::Serialize;
use tracing::{error, info};

//=========================================================================================
// HTTP relay
//=========================================================================================

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    sender: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<&'a str>,
}

/// Posts each message as JSON to a transactional mail endpoint, authenticated
/// with an `api-key` header.
#[derive(Clone)]
pub struct HttpMailAdapter {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender: String,
}

impl HttpMailAdapter {
    pub fn new(http: reqwest::Client, endpoint: String, api_key: String, sender: String) -> Self {
        Self {
            http,
            endpoint,
            api_key,
            sender,
        }
    }
}

#[async_trait]
impl MailService for HttpMailAdapter {
    async fn send(&self, email: OutgoingEmail) -> PortResult<()> {
        let body = RelayRequest {
            sender: Address {
                email: &self.sender,
            },
            to: vec![Address { email: &email.to }],
            subject: &email.subject,
            text_content: email.text.as_deref(),
            html_content: email.html.as_deref(),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Mail relay unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            error!("Mail relay rejected message: {} - {}", status, detail);
            return Err(PortError::Unexpected(format!(
                "Mail relay returned {}",
                status
            )));
        }

        info!("Sent '{}' email", email.subject);
        Ok(())
    }
}

//=========================================================================================
// Log-only fallback
//=========================================================================================

/// Used when no relay is configured. Records that a message would have been
/// sent; bodies are not logged since they carry one-time codes.
#[derive(Clone, Default)]
pub struct LogMailAdapter;

#[async_trait]
impl MailService for LogMailAdapter {
    async fn send(&self, email: OutgoingEmail) -> PortResult<()> {
        info!(
            "Mail relay not configured; dropping '{}' email to {}",
            email.subject, email.to
        );
        Ok(())
    }
}
