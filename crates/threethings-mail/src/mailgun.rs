use async_trait::async_trait;
use serde::Deserialize;
use threethings_core::config::MailgunConfig;
use tracing::{debug, warn};

use crate::error::{MailError, Result};
use crate::mailer::{Mailer, OutboundMessage};

/// Sends mail through the Mailgun messages API.
pub struct MailgunMailer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

impl MailgunMailer {
    pub fn new(config: &MailgunConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/v3/{}/messages",
                config.base_url.trim_end_matches('/'),
                config.domain
            ),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Form fields for the messages API. Custom headers use the `h:` prefix.
pub(crate) fn form_fields(msg: &OutboundMessage) -> Vec<(String, String)> {
    let mut fields = vec![("from".to_string(), msg.from.clone())];
    fields.extend(msg.to.iter().map(|to| ("to".to_string(), to.clone())));
    fields.push(("subject".to_string(), msg.subject.clone()));
    fields.push(("text".to_string(), msg.body.clone()));
    fields.extend(
        msg.headers
            .iter()
            .map(|(name, value)| (format!("h:{name}"), value.clone())),
    );
    fields
}

#[async_trait]
impl Mailer for MailgunMailer {
    fn name(&self) -> &str {
        "mailgun"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        msg.check()?;
        debug!(to = ?msg.to, subject = %msg.subject, "sending via Mailgun");

        let resp = self
            .client
            .post(&self.endpoint)
            .basic_auth("api", Some(&self.api_key))
            .form(&form_fields(msg))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Mailgun API error");
            return Err(MailError::Api {
                status,
                message: text,
            });
        }

        let accepted: SendResponse = resp.json().await.unwrap_or(SendResponse { id: None });
        debug!(id = ?accepted.id, "Mailgun accepted message");
        Ok(())
    }
}
