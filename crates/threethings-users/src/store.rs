use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::instrument;

use crate::error::Result;
use crate::types::{NewStatusUpdate, NewUser, StatusUpdate, User};
use crate::{db, ledger, users};

/// Thread-safe handle on the threethings database.
///
/// Wraps a single SQLite connection in a `Mutex`. Callers must not hold the
/// connection across an `.await`; use [`Store::with_conn`] for short
/// synchronous sections and do network I/O outside it.
pub struct Store {
    db: Mutex<Connection>,
}

impl Store {
    /// Wrap an already-open connection; the schema is created if missing.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(db::open_in_memory()?)
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T, E>(
        &self,
        f: impl FnOnce(&mut Connection) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let mut conn = self
            .db
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut conn)
    }

    #[instrument(skip(self, new), fields(email = %new.email_address))]
    pub fn add_user(&self, new: &NewUser) -> Result<User> {
        self.with_conn(|conn| users::create_user(conn, new, Utc::now()))
    }

    pub fn get_user(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| users::get_user(conn, email))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| users::list_users(conn))
    }

    #[instrument(skip(self))]
    pub fn remove_user(&self, email: &str) -> Result<()> {
        self.with_conn(|conn| users::remove_user(conn, email))
    }

    #[instrument(skip(self))]
    pub fn set_notifications(&self, email: &str, on: bool) -> Result<()> {
        self.with_conn(|conn| users::set_notifications(conn, email, on))
    }

    /// Record every update in one transaction: all are stored or none.
    #[instrument(skip(self, updates), fields(count = updates.len()))]
    pub fn record_updates(&self, updates: &[NewStatusUpdate]) -> Result<Vec<StatusUpdate>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let stored = updates
                .iter()
                .map(|u| ledger::insert_update(&tx, u))
                .collect::<Result<Vec<_>>>()?;
            tx.commit()?;
            Ok(stored)
        })
    }

    /// Stamp `last_notified = when` for every address in one transaction.
    #[instrument(skip(self, emails), fields(count = emails.len()))]
    pub fn mark_notified(&self, emails: &[String], when: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for email in emails {
                users::mark_notified(&tx, email, when)?;
            }
            tx.commit()?;
            Ok(())
        })
    }
}
