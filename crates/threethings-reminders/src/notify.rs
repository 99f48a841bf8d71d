use chrono::{DateTime, Utc};
use serde::Serialize;
use threethings_core::WeekWindow;
use threethings_mail::{templates, Mailer};
use threethings_users::{Store, User};
use tracing::{info, instrument, warn};

use crate::error::{ReminderError, Result};
use crate::selector::NotificationSelector;

#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyOptions {
    /// Skip every eligibility rule and remind all users.
    pub force: bool,
    /// Report who is due without sending or recording anything.
    pub dry_run: bool,
}

/// What one notification run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotifyReport {
    pub when: Option<DateTime<Utc>>,
    pub due: Vec<String>,
    /// Addresses that were sent a reminder and stamped as notified.
    pub notified: Vec<String>,
    /// Users whose check or send failed, with the reason. Nothing is
    /// recorded for them, so the next run tries again.
    pub errors: Vec<(String, String)>,
}

/// Select the due users, remind each, then record `last_notified = when`
/// in one transaction for every address the transport accepted.
///
/// A failed send is reported in [`NotifyReport::errors`] and leaves that
/// user due; the others are still stamped, so they are not reminded twice.
#[instrument(skip(store, mailer, sender), fields(mailer = mailer.name()))]
pub async fn run_notifications(
    store: &Store,
    mailer: &dyn Mailer,
    sender: &str,
    when: DateTime<Utc>,
    opts: NotifyOptions,
) -> Result<NotifyReport> {
    let mut report = NotifyReport {
        when: Some(when),
        ..Default::default()
    };

    let due: Vec<User> = store.with_conn(|conn| {
        let mut due = Vec::new();
        for item in NotificationSelector::new(conn, when, opts.force)? {
            match item {
                Ok(user) => due.push(user),
                Err(ReminderError::UserCheck { email, source }) => {
                    warn!(%email, error = %source, "eligibility check failed; skipping user");
                    report.errors.push((email, source.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(due)
    })?;
    report.due = due.iter().map(|u| u.email_address.clone()).collect();

    if opts.dry_run || due.is_empty() {
        info!(due = report.due.len(), dry_run = opts.dry_run, "notification run finished");
        return Ok(report);
    }

    let window = WeekWindow::containing(when);
    let mut sent = Vec::with_capacity(due.len());
    for user in &due {
        let message = templates::reminder(sender, &user.email_address, window.iso_year, window.week);
        match mailer.send(&message).await {
            Ok(()) => {
                info!(email = %user.email_address, "reminder sent");
                sent.push(user.email_address.clone());
            }
            Err(e) => {
                warn!(email = %user.email_address, error = %e, "reminder not sent");
                report.errors.push((user.email_address.clone(), e.to_string()));
            }
        }
    }

    store.mark_notified(&sent, when)?;
    report.notified = sent;
    info!(
        notified = report.notified.len(),
        failed = report.errors.len(),
        "notification run finished"
    );
    Ok(report)
}
