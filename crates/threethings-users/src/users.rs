use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use threethings_core::time::{format_timestamp, resolve_timezone};
use tracing::info;

use crate::db::{row_to_user, USER_COLUMNS};
use crate::error::{Result, StoreError};
use crate::types::{NewUser, User};

/// Register a user. The timezone must resolve in the IANA database so a bad
/// name is caught here rather than on the next reminder pass.
pub fn create_user(conn: &Connection, new: &NewUser, now: DateTime<Utc>) -> Result<User> {
    resolve_timezone(&new.timezone)?;
    let user = User {
        email_address: new.email_address.trim().to_string(),
        display_name: new.display_name.clone(),
        timezone: new.timezone.clone(),
        notifications_on: true,
        last_notified: None,
        created_at: now,
    };
    let inserted = conn.execute(
        "INSERT INTO users
            (email_address, display_name, timezone, notifications_on, last_notified, created_at)
         VALUES (?1, ?2, ?3, 1, NULL, ?4)",
        params![
            user.email_address,
            user.display_name,
            user.timezone,
            format_timestamp(&user.created_at),
        ],
    );
    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(StoreError::AlreadyExists(user.email_address));
        }
        Err(e) => return Err(e.into()),
    }
    info!(email = %user.email_address, timezone = %user.timezone, "user added");
    Ok(user)
}

/// Load a user by email. Returns None instead of an error when absent so
/// callers decide whether missing is exceptional in their context.
pub fn get_user(conn: &Connection, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email_address = ?1");
    match conn.query_row(&sql, params![email], row_to_user) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Database(e)),
    }
}

/// Every user, ordered by email address.
pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY email_address");
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Delete a user; their status updates go with them (ON DELETE CASCADE).
pub fn remove_user(conn: &Connection, email: &str) -> Result<()> {
    let n = conn.execute("DELETE FROM users WHERE email_address = ?1", params![email])?;
    if n == 0 {
        return Err(StoreError::NotFound(email.to_string()));
    }
    info!(email, "user removed");
    Ok(())
}

/// Mute (`false`) or unmute (`true`) reminders for a user.
pub fn set_notifications(conn: &Connection, email: &str, on: bool) -> Result<()> {
    let n = conn.execute(
        "UPDATE users SET notifications_on = ?2 WHERE email_address = ?1",
        params![email, on as i32],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound(email.to_string()));
    }
    info!(email, notifications_on = on, "notification preference changed");
    Ok(())
}

/// Stamp the instant a reminder was sent.
pub fn mark_notified(conn: &Connection, email: &str, when: DateTime<Utc>) -> Result<()> {
    let n = conn.execute(
        "UPDATE users SET last_notified = ?2 WHERE email_address = ?1",
        params![email, format_timestamp(&when)],
    )?;
    if n == 0 {
        return Err(StoreError::NotFound(email.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use threethings_core::CoreError;

    fn new_user(email: &str, tz: &str) -> NewUser {
        NewUser {
            email_address: email.to_string(),
            display_name: None,
            timezone: tz.to_string(),
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        threethings_core::time::parse_instant(s).unwrap()
    }

    #[test]
    fn create_and_fetch() {
        let conn = open_in_memory().unwrap();
        let created =
            create_user(&conn, &new_user("boston@example.com", "US/Eastern"), at("2015-02-01T00:00:00Z"))
                .unwrap();
        let fetched = get_user(&conn, "boston@example.com").unwrap().unwrap();
        assert_eq!(created, fetched);
        assert!(fetched.notifications_on);
        assert!(fetched.last_notified.is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let conn = open_in_memory().unwrap();
        let u = new_user("a@example.com", "UTC");
        create_user(&conn, &u, Utc::now()).unwrap();
        let err = create_user(&conn, &u, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref e) if e == "a@example.com"));
    }

    #[test]
    fn unknown_timezone_is_rejected_before_insert() {
        let conn = open_in_memory().unwrap();
        let err = create_user(&conn, &new_user("a@example.com", "Nowhere/Land"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::UnknownTimezone(_))));
        assert!(list_users(&conn).unwrap().is_empty());
    }

    #[test]
    fn mute_unmute_and_mark_notified() {
        let conn = open_in_memory().unwrap();
        create_user(&conn, &new_user("a@example.com", "UTC"), Utc::now()).unwrap();

        set_notifications(&conn, "a@example.com", false).unwrap();
        assert!(!get_user(&conn, "a@example.com").unwrap().unwrap().notifications_on);
        set_notifications(&conn, "a@example.com", true).unwrap();
        assert!(get_user(&conn, "a@example.com").unwrap().unwrap().notifications_on);

        let when = at("2015-02-06T22:00:00Z");
        mark_notified(&conn, "a@example.com", when).unwrap();
        assert_eq!(
            get_user(&conn, "a@example.com").unwrap().unwrap().last_notified,
            Some(when)
        );
    }

    #[test]
    fn operations_on_missing_user_report_not_found() {
        let conn = open_in_memory().unwrap();
        assert!(get_user(&conn, "ghost@example.com").unwrap().is_none());
        assert!(matches!(
            remove_user(&conn, "ghost@example.com"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            set_notifications(&conn, "ghost@example.com", false),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            mark_notified(&conn, "ghost@example.com", Utc::now()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn list_is_ordered_by_email() {
        let conn = open_in_memory().unwrap();
        for email in ["singapore@example.com", "boston@example.com"] {
            create_user(&conn, &new_user(email, "UTC"), Utc::now()).unwrap();
        }
        let emails: Vec<_> = list_users(&conn)
            .unwrap()
            .into_iter()
            .map(|u| u.email_address)
            .collect();
        assert_eq!(emails, ["boston@example.com", "singapore@example.com"]);
    }
}
