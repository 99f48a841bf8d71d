use chrono::{DateTime, Utc};
use rusqlite::Connection;
use threethings_users::{users, User};
use tracing::debug;

use crate::eligibility::{check, Decision};
use crate::error::{ReminderError, Result};

/// Lazily yields the users who should be reminded at `when`.
///
/// The user list is read once, when the selector is built; each user's
/// eligibility (including the ledger query) is evaluated as the iterator
/// advances. Build a new selector to start over.
pub struct NotificationSelector<'c> {
    conn: &'c Connection,
    users: std::vec::IntoIter<User>,
    when: DateTime<Utc>,
    force: bool,
}

impl<'c> NotificationSelector<'c> {
    pub fn new(conn: &'c Connection, when: DateTime<Utc>, force: bool) -> Result<Self> {
        let users = users::list_users(conn)?;
        Ok(Self {
            conn,
            users: users.into_iter(),
            when,
            force,
        })
    }

    pub fn when(&self) -> DateTime<Utc> {
        self.when
    }
}

impl Iterator for NotificationSelector<'_> {
    /// A user to remind, or [`ReminderError::UserCheck`] naming the user
    /// whose check failed.
    type Item = Result<User>;

    fn next(&mut self) -> Option<Self::Item> {
        for user in self.users.by_ref() {
            match check(self.conn, &user, self.when, self.force) {
                Ok(decision) if decision.should_notify() => return Some(Ok(user)),
                Ok(decision) => {
                    debug!(email = %user.email_address, ?decision, "not notifying");
                }
                Err(e) => {
                    return Some(Err(ReminderError::UserCheck {
                        email: user.email_address,
                        source: Box::new(e),
                    }))
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.users.size_hint().1)
    }
}

/// Users due a reminder at `when` (now when `None`).
pub fn to_notify(
    conn: &Connection,
    when: Option<DateTime<Utc>>,
    force: bool,
) -> Result<NotificationSelector<'_>> {
    NotificationSelector::new(conn, when.unwrap_or_else(Utc::now), force)
}

/// Every user with the decision the rules reached for them. Used by
/// `notify --dry-run` to explain why someone was skipped.
pub fn explain(
    conn: &Connection,
    when: DateTime<Utc>,
    force: bool,
) -> Result<Vec<(User, Result<Decision>)>> {
    let users = users::list_users(conn)?;
    Ok(users
        .into_iter()
        .map(|user| {
            let decision = check(conn, &user, when, force);
            (user, decision)
        })
        .collect())
}
