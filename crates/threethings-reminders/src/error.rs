use thiserror::Error;
use threethings_core::CoreError;
use threethings_mail::MailError;
use threethings_users::StoreError;

/// Errors that can occur while deciding, sending or summarising reminders.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// Bad timezone name or instant.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The transport refused a message.
    #[error("Mail delivery failed: {0}")]
    Mail(#[from] MailError),

    /// One user's eligibility check failed; the others are unaffected.
    #[error("Checking {email}: {source}")]
    UserCheck {
        email: String,
        source: Box<ReminderError>,
    },
}

impl From<rusqlite::Error> for ReminderError {
    fn from(e: rusqlite::Error) -> Self {
        ReminderError::Store(StoreError::Database(e))
    }
}

pub type Result<T> = std::result::Result<T, ReminderError>;
