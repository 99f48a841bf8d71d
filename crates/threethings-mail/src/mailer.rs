use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::{MailError, Result};

/// A fully rendered email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Extra headers such as `In-Reply-To`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
}

impl OutboundMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(MailError::InvalidMessage("no recipients".to_string()));
        }
        if self.to.iter().any(|r| !r.contains('@')) {
            return Err(MailError::InvalidMessage(format!(
                "bad recipient in {:?}",
                self.to
            )));
        }
        Ok(())
    }
}

/// Outbound email capability.
///
/// Implementations must be `Send + Sync` so one mailer can be shared by the
/// HTTP handlers and the reminder engine.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Stable lowercase identifier, used in logs.
    fn name(&self) -> &str;

    /// Deliver one message. `Ok` means the transport accepted it.
    async fn send(&self, msg: &OutboundMessage) -> Result<()>;
}

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        msg.check()?;
        info!(
            to = ?msg.to,
            subject = %msg.subject,
            bytes = msg.body.len(),
            "mail (log transport, not delivered)"
        );
        Ok(())
    }
}
