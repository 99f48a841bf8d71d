//! `threethings-mail`: outbound email.
//!
//! Everything that sends mail goes through the [`Mailer`] trait so the
//! transport can be swapped by configuration:
//!
//! | Provider  | Behaviour                                  |
//! |-----------|--------------------------------------------|
//! | `mailgun` | POST to the Mailgun messages API           |
//! | `log`     | Log the message, deliver nothing (default) |

pub mod error;
pub mod mailer;
pub mod mailgun;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod templates;

use std::sync::Arc;

use threethings_core::config::{MailConfig, MailProvider};
use tracing::info;

pub use error::{MailError, Result};
pub use mailer::{LogMailer, Mailer, OutboundMessage};
pub use mailgun::MailgunMailer;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryMailer;

/// Build the configured transport.
pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.provider {
        MailProvider::Mailgun => {
            let mg = config.mailgun.as_ref().ok_or_else(|| {
                MailError::Config("mail.provider is mailgun but [mail.mailgun] is missing".into())
            })?;
            let mailer = MailgunMailer::new(mg);
            info!(endpoint = %mailer.endpoint(), "mail transport: Mailgun");
            Ok(Arc::new(mailer))
        }
        MailProvider::Log => {
            info!("mail transport: log only (messages are not delivered)");
            Ok(Arc::new(LogMailer))
        }
    }
}
