//! Mandrill inbound routes. Mandrill batches events as a JSON array in the
//! `mandrill_events` form field.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, Form, Json};
use serde::Deserialize;
use serde_json::Value;
use threethings_core::time::from_unix_seconds;
use threethings_users::{NewStatusUpdate, StatusUpdate};
use tracing::info;

use super::ingest::{ingest, IngestError, InboundEmail};
use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct MandrillForm {
    pub mandrill_events: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MandrillEvent {
    pub event: String,
    pub ts: Option<f64>,
    pub msg: Option<MandrillMessage>,
}

#[derive(Debug, Deserialize)]
pub struct MandrillMessage {
    pub from_email: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, Value>,
}

/// GET /mandrill/
pub async fn landing() -> &'static str {
    "threethings: Mandrill inbound endpoint"
}

/// POST /mandrill/receive
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Form(form): Form<MandrillForm>,
) -> Result<Json<Vec<StatusUpdate>>, IngestError> {
    let raw = form
        .mandrill_events
        .ok_or_else(|| IngestError::Malformed("missing field `mandrill_events`".into()))?;
    let emails = parse_events(&raw)?;
    info!(count = emails.len(), "Mandrill batch received");
    Ok(Json(ingest(&state, emails).await?))
}

/// Every event in the batch must be `inbound`; one stray event rejects all.
pub fn parse_events(raw: &str) -> Result<Vec<InboundEmail>, IngestError> {
    let events: Vec<MandrillEvent> =
        serde_json::from_str(raw).map_err(|e| IngestError::Malformed(e.to_string()))?;

    if let Some(bad) = events.iter().find(|e| e.event != "inbound") {
        return Err(IngestError::UnexpectedEvent(bad.event.clone()));
    }

    events.into_iter().map(to_email).collect()
}

fn to_email(event: MandrillEvent) -> Result<InboundEmail, IngestError> {
    let created_at = event
        .ts
        .and_then(from_unix_seconds)
        .ok_or_else(|| IngestError::Malformed("inbound event without a valid `ts`".into()))?;
    let msg = event
        .msg
        .ok_or_else(|| IngestError::Malformed("inbound event without `msg`".into()))?;
    let text = msg
        .text
        .ok_or_else(|| IngestError::Malformed(format!("no text body from {}", msg.from_email)))?;
    let message_id = msg
        .headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("message-id"))
        .and_then(|(_, v)| v.as_str())
        .map(str::to_string);

    Ok(InboundEmail {
        update: NewStatusUpdate {
            email_address: msg.from_email,
            status: text,
            html: msg.html,
            created_at,
        },
        subject: msg.subject,
        message_id,
    })
}
