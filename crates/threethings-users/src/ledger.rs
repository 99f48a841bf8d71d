//! The status-update ledger: append-only rows queried by week window.

use rusqlite::{params, Connection};
use threethings_core::time::format_timestamp;
use threethings_core::WeekWindow;
use tracing::info;
use uuid::Uuid;

use crate::db::{row_to_update, UPDATE_COLUMNS};
use crate::error::{Result, StoreError};
use crate::types::{NewStatusUpdate, StatusUpdate};
use crate::users::get_user;

/// Append a status update. The author must be a registered user.
pub fn insert_update(conn: &Connection, new: &NewStatusUpdate) -> Result<StatusUpdate> {
    if get_user(conn, &new.email_address)?.is_none() {
        return Err(StoreError::NotFound(new.email_address.clone()));
    }
    let update = StatusUpdate {
        id: Uuid::now_v7().to_string(),
        email_address: new.email_address.clone(),
        status: new.status.clone(),
        html: new.html.clone(),
        created_at: new.created_at,
    };
    conn.execute(
        "INSERT INTO status_updates (id, email_address, status, html, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            update.id,
            update.email_address,
            update.status,
            update.html,
            format_timestamp(&update.created_at),
        ],
    )?;
    info!(id = %update.id, email = %update.email_address, "status update recorded");
    Ok(update)
}

/// Every update inside `window`, oldest first.
pub fn updates_in_window(conn: &Connection, window: &WeekWindow) -> Result<Vec<StatusUpdate>> {
    let sql = format!(
        "SELECT {UPDATE_COLUMNS} FROM status_updates
         WHERE created_at >= ?1 AND created_at <= ?2
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![format_timestamp(&window.start), format_timestamp(&window.end)],
            row_to_update,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One user's updates inside `window`, oldest first.
pub fn updates_for_user(
    conn: &Connection,
    email: &str,
    window: &WeekWindow,
) -> Result<Vec<StatusUpdate>> {
    let sql = format!(
        "SELECT {UPDATE_COLUMNS} FROM status_updates
         WHERE email_address = ?1 AND created_at >= ?2 AND created_at <= ?3
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![
                email,
                format_timestamp(&window.start),
                format_timestamp(&window.end)
            ],
            row_to_update,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// How many updates a user has inside `window`.
pub fn count_for_user(conn: &Connection, email: &str, window: &WeekWindow) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM status_updates
         WHERE email_address = ?1 AND created_at >= ?2 AND created_at <= ?3",
        params![
            email,
            format_timestamp(&window.start),
            format_timestamp(&window.end)
        ],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}
