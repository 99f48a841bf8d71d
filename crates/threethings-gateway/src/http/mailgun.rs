//! Mailgun inbound routes: form-encoded POSTs, optionally signed.

use std::sync::Arc;

use axum::{extract::State, Form, Json};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use threethings_core::time::from_unix_seconds;
use threethings_users::{NewStatusUpdate, StatusUpdate};
use tracing::{info, warn};

use super::ingest::{ingest, IngestError, InboundEmail};
use crate::app::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Fields Mailgun posts for a stored/forwarded message. Everything is
/// optional here so a missing field becomes a 400, not an extractor error.
#[derive(Debug, Default, Deserialize)]
pub struct MailgunForm {
    pub sender: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "body-plain")]
    pub body_plain: Option<String>,
    #[serde(rename = "body-html")]
    pub body_html: Option<String>,
    #[serde(rename = "Message-Id")]
    pub message_id: Option<String>,
    pub timestamp: Option<String>,
    pub token: Option<String>,
    pub signature: Option<String>,
}

/// GET /mailgun/
pub async fn landing() -> &'static str {
    "threethings: Mailgun inbound endpoint"
}

/// POST /mailgun/receive
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Form(form): Form<MailgunForm>,
) -> Result<Json<Vec<StatusUpdate>>, IngestError> {
    let signing_key = state
        .config
        .mail
        .mailgun
        .as_ref()
        .and_then(|mg| mg.signing_key.as_deref());
    if let Some(key) = signing_key {
        verify_signature(key, &form).map_err(|reason| {
            warn!(%reason, "rejecting unsigned or mis-signed Mailgun post");
            IngestError::BadSignature
        })?;
    }

    let email = parse(form)?;
    info!(email = %email.update.email_address, "Mailgun update received");
    Ok(Json(ingest(&state, vec![email]).await?))
}

fn required(field: Option<String>, name: &str) -> Result<String, IngestError> {
    field.ok_or_else(|| IngestError::Malformed(format!("missing field `{name}`")))
}

fn parse(form: MailgunForm) -> Result<InboundEmail, IngestError> {
    let author = required(form.sender, "sender")?;
    let subject = required(form.subject, "subject")?;
    let text = required(form.body_plain, "body-plain")?;
    let raw_ts = required(form.timestamp, "timestamp")?;
    let created_at = raw_ts
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(from_unix_seconds)
        .ok_or_else(|| IngestError::Malformed(format!("bad timestamp `{raw_ts}`")))?;

    Ok(InboundEmail {
        update: NewStatusUpdate {
            email_address: author,
            status: text,
            html: form.body_html,
            created_at,
        },
        subject: Some(subject),
        message_id: form.message_id,
    })
}

/// `signature` must be hex(HMAC-SHA256(key, timestamp ++ token)).
fn verify_signature(key: &str, form: &MailgunForm) -> Result<(), String> {
    let (Some(timestamp), Some(token), Some(signature)) =
        (&form.timestamp, &form.token, &form.signature)
    else {
        return Err("missing timestamp, token or signature".to_string());
    };
    let expected = hex::decode(signature).map_err(|_| "signature is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| "HMAC signature mismatch".to_string())
}
