//! Shared path for every inbound-mail webhook: store the updates, then
//! acknowledge each author.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use threethings_mail::templates;
use threethings_users::{NewStatusUpdate, StatusUpdate, StoreError};
use tracing::{info, warn};

use crate::app::AppState;

/// Why an inbound webhook was refused.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Mandrill delivered something other than an inbound message.
    #[error("Unexpected event: {0}")]
    UnexpectedEvent(String),

    #[error("Unknown sender: {0}")]
    UnknownSender(String),

    #[error("Invalid webhook signature")]
    BadSignature,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::Malformed(_) | IngestError::UnexpectedEvent(_) => StatusCode::BAD_REQUEST,
            IngestError::UnknownSender(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::BadSignature => StatusCode::UNAUTHORIZED,
            IngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "inbound mail failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// One received email, ready to become a status update.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    pub update: NewStatusUpdate,
    pub subject: Option<String>,
    pub message_id: Option<String>,
}

/// Store every update in one transaction, then send confirmations.
///
/// A confirmation that fails to send is logged; the updates stay stored.
pub async fn ingest(
    state: &AppState,
    emails: Vec<InboundEmail>,
) -> Result<Vec<StatusUpdate>, IngestError> {
    let updates: Vec<NewStatusUpdate> = emails.iter().map(|e| e.update.clone()).collect();
    let stored = state.store.record_updates(&updates).map_err(|e| match e {
        StoreError::NotFound(email) => IngestError::UnknownSender(email),
        other => IngestError::Store(other),
    })?;
    info!(count = stored.len(), "status updates stored");

    let sender = &state.config.mail.sender;
    for email in &emails {
        let message = templates::confirmation(
            sender,
            &email.update.email_address,
            email.message_id.as_deref(),
            email.subject.as_deref(),
        );
        if let Err(e) = state.mailer.send(&message).await {
            warn!(email = %email.update.email_address, error = %e, "confirmation not sent");
        }
    }
    Ok(stored)
}
