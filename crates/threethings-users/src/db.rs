use std::path::Path;

use rusqlite::{types::Type, Connection, Result};
use threethings_core::time::parse_timestamp;

use crate::types::{StatusUpdate, User};

pub(crate) const USER_COLUMNS: &str =
    "email_address, display_name, timezone, notifications_on, last_notified, created_at";

pub(crate) const UPDATE_COLUMNS: &str = "id, email_address, status, html, created_at";

/// Open (or create) the database file and bring the schema up to date.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    prepare(&conn)?;
    Ok(conn)
}

/// Fresh private database, used by tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    // Foreign keys are per-connection in SQLite; the cascade from users to
    // status_updates depends on this.
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    init_db(conn)
}

/// Initialise all tables. Idempotent; runs on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    create_users_table(conn)?;
    create_status_updates_table(conn)?;
    Ok(())
}

fn create_users_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            email_address     TEXT PRIMARY KEY NOT NULL,
            display_name      TEXT,
            timezone          TEXT NOT NULL,
            notifications_on  INTEGER NOT NULL DEFAULT 1,
            last_notified     TEXT,               -- RFC 3339 UTC or NULL
            created_at        TEXT NOT NULL
        );",
    )
}

fn create_status_updates_table(conn: &Connection) -> Result<()> {
    // Window queries filter on (email_address, created_at); timestamps are
    // fixed-width UTC text so range comparisons are chronological.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS status_updates (
            id             TEXT PRIMARY KEY NOT NULL,
            email_address  TEXT NOT NULL
                           REFERENCES users(email_address) ON DELETE CASCADE,
            status         TEXT NOT NULL,
            html           TEXT,
            created_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_status_updates_owner_time
            ON status_updates (email_address, created_at);",
    )
}

/// Map a row selected with USER_COLUMNS to a User.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User> {
    let last_notified = match row.get::<_, Option<String>>(4)? {
        Some(s) => Some(timestamp_column(4, &s)?),
        None => None,
    };
    Ok(User {
        email_address: row.get(0)?,
        display_name: row.get(1)?,
        timezone: row.get(2)?,
        notifications_on: row.get::<_, i32>(3)? != 0,
        last_notified,
        created_at: timestamp_column(5, &row.get::<_, String>(5)?)?,
    })
}

/// Map a row selected with UPDATE_COLUMNS to a StatusUpdate.
pub(crate) fn row_to_update(row: &rusqlite::Row<'_>) -> Result<StatusUpdate> {
    Ok(StatusUpdate {
        id: row.get(0)?,
        email_address: row.get(1)?,
        status: row.get(2)?,
        html: row.get(3)?,
        created_at: timestamp_column(4, &row.get::<_, String>(4)?)?,
    })
}

fn timestamp_column(idx: usize, raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
