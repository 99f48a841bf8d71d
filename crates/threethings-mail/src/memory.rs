//! Recording transport for tests. Built for this crate's own tests and,
//! through the `testing` feature, for dependents' tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{MailError, Result};
use crate::mailer::{Mailer, OutboundMessage};

/// Keeps every accepted message in memory instead of delivering it.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutboundMessage>>,
    /// Recipient for whom `send` fails, to exercise error paths.
    reject: Option<String>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer that refuses any message addressed to `recipient`.
    pub fn rejecting(recipient: &str) -> Self {
        Self {
            sent: Mutex::default(),
            reject: Some(recipient.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<()> {
        msg.check()?;
        if let Some(ref bad) = self.reject {
            if msg.to.iter().any(|r| r == bad) {
                return Err(MailError::Api {
                    status: 550,
                    message: format!("mailbox unavailable: {bad}"),
                });
            }
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(msg.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(to: &str) -> OutboundMessage {
        OutboundMessage {
            from: "robot@example.com".to_string(),
            to: vec![to.to_string()],
            subject: "hi".to_string(),
            body: "body".to_string(),
            headers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn memory_mailer_records_and_rejects() {
        let mailer = MemoryMailer::rejecting("bad@example.com");
        mailer.send(&msg("good@example.com")).await.unwrap();
        let err = mailer.send(&msg("bad@example.com")).await.unwrap_err();
        assert!(matches!(err, MailError::Api { status: 550, .. }));
        assert_eq!(mailer.sent().len(), 1);
    }
}
