use thiserror::Error;

/// Errors that can occur while handing a message to an outbound transport.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A message was rejected before it reached the transport.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Mail configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MailError>;
