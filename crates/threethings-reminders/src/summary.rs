use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use threethings_core::WeekWindow;
use threethings_users::{ledger, users, StatusUpdate, User};

use crate::error::Result;

/// The compiled digest for one week window.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub window: WeekWindow,
    /// Updates per author, oldest first within each author.
    pub updates_by_user: BTreeMap<String, Vec<StatusUpdate>>,
    /// Active users (notifications on) with nothing in the window.
    pub missing: Vec<User>,
    #[serde(skip)]
    users: BTreeMap<String, User>,
}

impl WeeklySummary {
    /// Read the window's updates and the user list in one pass.
    pub fn compile(conn: &Connection, when: DateTime<Utc>) -> Result<Self> {
        let window = WeekWindow::containing(when);
        let all_users: BTreeMap<String, User> = users::list_users(conn)?
            .into_iter()
            .map(|u| (u.email_address.clone(), u))
            .collect();

        let mut updates_by_user: BTreeMap<String, Vec<StatusUpdate>> = BTreeMap::new();
        for update in ledger::updates_in_window(conn, &window)? {
            updates_by_user
                .entry(update.email_address.clone())
                .or_default()
                .push(update);
        }

        let missing = all_users
            .values()
            .filter(|u| u.notifications_on && !updates_by_user.contains_key(&u.email_address))
            .cloned()
            .collect();

        Ok(Self {
            window,
            updates_by_user,
            missing,
            users: all_users,
        })
    }

    pub fn users_with_updates(&self) -> BTreeSet<&str> {
        self.updates_by_user.keys().map(String::as_str).collect()
    }

    pub fn users_without_updates(&self) -> BTreeSet<&str> {
        self.missing.iter().map(|u| u.email_address.as_str()).collect()
    }

    /// Addresses the digest is mailed to: every user with notifications on.
    pub fn recipients(&self) -> Vec<String> {
        self.users
            .values()
            .filter(|u| u.notifications_on)
            .map(|u| u.email_address.clone())
            .collect()
    }

    fn label_for(&self, email: &str) -> String {
        match self.users.get(email) {
            Some(u) if u.label() != u.email_address => format!("{} <{}>", u.label(), email),
            _ => email.to_string(),
        }
    }

    /// Plain-text digest: everyone's updates, then who is missing.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Status updates for Week {} of {}",
            self.window.week, self.window.iso_year
        );
        let _ = writeln!(
            out,
            "(received {} to {})",
            self.window.start.format("%a %Y-%m-%d %H:%M UTC"),
            self.window.end.format("%a %Y-%m-%d %H:%M UTC"),
        );

        if self.updates_by_user.is_empty() {
            let _ = writeln!(out, "\nNobody has sent an update yet.");
        }
        for (email, updates) in &self.updates_by_user {
            let _ = writeln!(out, "\n== {} ==", self.label_for(email));
            for update in updates {
                let _ = writeln!(out, "[{}]", update.created_at.format("%a %Y-%m-%d %H:%M UTC"));
                let _ = writeln!(out, "{}", update.status.trim_end());
            }
        }

        if !self.missing.is_empty() {
            let _ = writeln!(out, "\nStill waiting to hear from:");
            for user in &self.missing {
                let _ = writeln!(out, " - {}", self.label_for(&user.email_address));
            }
        }

        let _ = write!(out, "\nCheers,\nFriendly Robot\n");
        out
    }
}
