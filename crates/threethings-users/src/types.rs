use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A person who is reminded to send a weekly status update.
///
/// The email address is the primary key: inbound replies are matched to
/// users by their sender address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email_address: String,
    pub display_name: Option<String>,
    /// IANA name, validated when the user is created.
    pub timezone: String,
    pub notifications_on: bool,
    pub last_notified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name used in digests and greetings.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(self.email_address.as_str())
    }
}

/// Fields accepted when registering a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email_address: String,
    pub display_name: Option<String>,
    pub timezone: String,
}

/// One status report, as received by email. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// UUIDv7, so ids sort roughly by arrival.
    pub id: String,
    #[serde(rename = "email")]
    pub email_address: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(rename = "when")]
    pub created_at: DateTime<Utc>,
}

/// A status update before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct NewStatusUpdate {
    pub email_address: String,
    pub status: String,
    pub html: Option<String>,
    pub created_at: DateTime<Utc>,
}
