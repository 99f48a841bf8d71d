//! `threethings-reminders`: who gets nudged, and the weekly digest.
//!
//! # Overview
//!
//! The [`selector::NotificationSelector`] walks the user list and applies the
//! rules in [`eligibility`] to each user at a reference instant. A
//! [`notify::run_notifications`] pass sends the reminders and records the
//! send time; the [`engine::ReminderEngine`] repeats that pass on an interval.
//!
//! # Eligibility rules (first match decides)
//!
//! | Rule            | Outcome                                        |
//! |-----------------|------------------------------------------------|
//! | `force`         | Always remind                                  |
//! | Muted           | Never remind                                   |
//! | Before deadline | Not before Friday 15:00 in the user's timezone |
//! | Cooldown        | Not within 24h of the previous reminder        |
//! | Reported        | Not when the week's window has an update       |

pub mod eligibility;
pub mod engine;
pub mod error;
pub mod notify;
pub mod selector;
pub mod summary;

use chrono::{DateTime, Utc};
use threethings_mail::{templates, Mailer};
use threethings_users::Store;
use tracing::{info, warn};

pub use eligibility::{should_be_notified, Decision};
pub use engine::ReminderEngine;
pub use error::{ReminderError, Result};
pub use notify::{run_notifications, NotifyOptions, NotifyReport};
pub use selector::{to_notify, NotificationSelector};
pub use summary::WeeklySummary;

/// Compile the digest for the week containing `when` and mail it to every
/// user with notifications on, one message per recipient.
///
/// Every recipient is attempted; the first transport error is returned
/// after the rest have been sent.
pub async fn send_summary(
    store: &Store,
    mailer: &dyn Mailer,
    sender: &str,
    when: DateTime<Utc>,
) -> Result<WeeklySummary> {
    let summary = store.with_conn(|conn| WeeklySummary::compile(conn, when))?;
    let recipients = summary.recipients();
    if recipients.is_empty() {
        info!("no active users; summary not sent");
        return Ok(summary);
    }
    let body = summary.render();
    let mut failure = None;
    for recipient in &recipients {
        let message = templates::summary(
            sender,
            recipient,
            summary.window.iso_year,
            summary.window.week,
            body.clone(),
        );
        if let Err(e) = mailer.send(&message).await {
            warn!(email = %recipient, error = %e, "summary not sent");
            failure.get_or_insert(e);
        }
    }
    if let Some(e) = failure {
        return Err(e.into());
    }
    info!(
        week = summary.window.week,
        recipients = recipients.len(),
        "summary sent"
    );
    Ok(summary)
}
