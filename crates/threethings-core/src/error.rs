use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The timezone name is not in the IANA database.
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// An instant was supplied without an explicit UTC offset.
    #[error("Instant has no timezone information: {0}")]
    NaiveInstant(String),

    #[error("Invalid instant '{input}': {reason}")]
    InvalidInstant { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
