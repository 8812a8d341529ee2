use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::mail_sender::{MailMessage, MailSender};

/// Posts messages as JSON to an HTTP mail relay.
pub struct HttpRelayMailSender {
    client: Client,
    relay_url: String,
    token: Option<String>,
    attempts: usize,
}

impl HttpRelayMailSender {
    pub fn new(relay_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            relay_url: relay_url.into(),
            token,
            attempts: 2,
        }
    }

    fn payload(message: &MailMessage) -> RelayPayload<'_> {
        RelayPayload {
            message_id: format!("<{}@fleet-report>", Uuid::new_v4()),
            from: &message.from,
            to: message
                .to
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect(),
            subject: &message.subject,
            text: &message.body,
            attachments: message
                .attachment
                .iter()
                .map(|a| RelayAttachment {
                    filename: &a.file_name,
                    content_type: &a.content_type,
                    content: STANDARD.encode(&a.data),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl MailSender for HttpRelayMailSender {
    /// Retries on non-2xx responses; transport errors fail immediately.
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let payload = Self::payload(message);
        let mut last_status: Option<StatusCode> = None;

        for attempt in 0..self.attempts {
            let mut req = self.client.post(&self.relay_url).json(&payload);
            if let Some(token) = &self.token {
                req = req.bearer_auth(token);
            }

            let resp = req.send().await?;
            let status = resp.status();
            if status.is_success() {
                debug!("Mail relay accepted {} (attempt {})", payload.message_id, attempt + 1);
                return Ok(());
            }

            warn!("Mail relay returned {} (attempt {})", status, attempt + 1);
            last_status = Some(status);
        }

        Err(anyhow!(
            "Mail relay failed after retries (last status: {:?})",
            last_status
        ))
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    message_id: String,
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<RelayAttachment<'a>>,
}

#[derive(Serialize)]
struct RelayAttachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    content: String,
}
