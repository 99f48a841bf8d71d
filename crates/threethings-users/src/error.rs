use thiserror::Error;
use threethings_core::CoreError;

/// All store-layer errors. Kept separate from CoreError so the gateway can
/// map them to HTTP status codes without coupling layers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
