use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use rusqlite::Connection;
use serde::Serialize;
use threethings_core::time::in_local_time;
use threethings_core::WeekWindow;
use threethings_users::{ledger, User};
use tracing::debug;

use crate::error::Result;

/// Local hour on Friday from which a missing update counts as late.
pub const DEADLINE_HOUR: u32 = 15;

/// Minimum gap between two reminders to the same user.
pub const COOLDOWN_HOURS: i64 = 24;

/// Outcome of the eligibility check, naming the rule that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// `force` was set; every other rule was skipped.
    Forced,
    /// Past the deadline, cooled down, and nothing reported this week.
    Due,
    Muted,
    BeforeDeadline,
    RecentlyNotified,
    AlreadyReported,
}

impl Decision {
    pub fn should_notify(self) -> bool {
        matches!(self, Decision::Forced | Decision::Due)
    }
}

/// Friday at or after 15:00 local, or any time on Saturday or Sunday.
pub fn is_past_deadline(local: &DateTime<Tz>) -> bool {
    match local.weekday() {
        Weekday::Fri => local.hour() >= DEADLINE_HOUR,
        Weekday::Sat | Weekday::Sun => true,
        _ => false,
    }
}

/// True when the user was never reminded, or strictly more than
/// [`COOLDOWN_HOURS`] have passed. Exactly 24h is still cooling down.
pub fn is_cooled_down(last_notified: Option<DateTime<Utc>>, when: DateTime<Utc>) -> bool {
    match last_notified {
        None => true,
        Some(last) => when - last > Duration::hours(COOLDOWN_HOURS),
    }
}

/// Apply the reminder rules in order, stopping at the first that fails.
///
/// `count_updates` is only called once every cheaper rule has passed, so a
/// muted or not-yet-late user never costs a ledger query.
pub fn evaluate<F>(
    user: &User,
    when: DateTime<Utc>,
    force: bool,
    count_updates: F,
) -> Result<Decision>
where
    F: FnOnce(&WeekWindow) -> Result<usize>,
{
    if force {
        return Ok(Decision::Forced);
    }
    if !user.notifications_on {
        return Ok(Decision::Muted);
    }

    let local = in_local_time(when, &user.timezone)?;
    debug!(email = %user.email_address, local = %local, "local time");
    if !is_past_deadline(&local) {
        return Ok(Decision::BeforeDeadline);
    }

    debug!(email = %user.email_address, last_notified = ?user.last_notified, "cooldown check");
    if !is_cooled_down(user.last_notified, when) {
        return Ok(Decision::RecentlyNotified);
    }

    if count_updates(&WeekWindow::containing(when))? > 0 {
        return Ok(Decision::AlreadyReported);
    }
    Ok(Decision::Due)
}

/// [`evaluate`] against the status-update ledger in `conn`.
pub fn check(
    conn: &Connection,
    user: &User,
    when: DateTime<Utc>,
    force: bool,
) -> Result<Decision> {
    evaluate(user, when, force, |window| {
        Ok(ledger::count_for_user(conn, &user.email_address, window)?)
    })
}

/// Convenience predicate over [`check`].
pub fn should_be_notified(
    conn: &Connection,
    user: &User,
    when: DateTime<Utc>,
    force: bool,
) -> Result<bool> {
    Ok(check(conn, user, when, force)?.should_notify())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReminderError;
    use threethings_core::time::parse_instant;
    use threethings_core::CoreError;

    fn at(s: &str) -> DateTime<Utc> {
        parse_instant(s).unwrap()
    }

    fn user(tz: &str) -> User {
        User {
            email_address: "someone@example.com".to_string(),
            display_name: None,
            timezone: tz.to_string(),
            notifications_on: true,
            last_notified: None,
            created_at: at("2015-01-01T00:00:00Z"),
        }
    }

    fn no_updates(_: &WeekWindow) -> Result<usize> {
        Ok(0)
    }

    const FRIDAY_22_UTC: &str = "2015-02-06T22:00:00Z";

    #[test]
    fn boston_is_due_on_friday_evening_utc() {
        let d = evaluate(&user("US/Eastern"), at(FRIDAY_22_UTC), false, no_updates).unwrap();
        assert_eq!(d, Decision::Due);
    }

    #[test]
    fn singapore_is_due_on_its_saturday() {
        let d = evaluate(&user("Singapore"), at(FRIDAY_22_UTC), false, no_updates).unwrap();
        assert_eq!(d, Decision::Due);
    }

    #[test]
    fn deadline_depends_on_local_time() {
        let morning = at("2015-02-06T08:00:00Z");
        let boston = evaluate(&user("US/Eastern"), morning, false, no_updates).unwrap();
        let singapore = evaluate(&user("Singapore"), morning, false, no_updates).unwrap();
        assert_eq!(boston, Decision::BeforeDeadline);
        assert_eq!(singapore, Decision::Due);
    }

    #[test]
    fn deadline_hour_is_inclusive() {
        let tz: Tz = "UTC".parse().unwrap();
        assert!(is_past_deadline(&at("2015-02-06T15:00:00Z").with_timezone(&tz)));
        assert!(!is_past_deadline(&at("2015-02-06T14:59:59Z").with_timezone(&tz)));
        assert!(is_past_deadline(&at("2015-02-08T00:00:00Z").with_timezone(&tz)));
        assert!(!is_past_deadline(&at("2015-02-09T23:00:00Z").with_timezone(&tz)));
    }

    #[test]
    fn muted_users_are_skipped_unless_forced() {
        let mut u = user("US/Eastern");
        u.notifications_on = false;
        let when = at(FRIDAY_22_UTC);
        assert_eq!(evaluate(&u, when, false, no_updates).unwrap(), Decision::Muted);
        assert_eq!(evaluate(&u, when, true, no_updates).unwrap(), Decision::Forced);
    }

    #[test]
    fn force_skips_every_rule() {
        let mut u = user("Not/AZone");
        u.last_notified = Some(at(FRIDAY_22_UTC));
        let d = evaluate(&u, at("2015-02-02T09:00:00Z"), true, |_| Ok(5)).unwrap();
        assert!(d.should_notify());
    }

    #[test]
    fn recent_reminder_blocks_another() {
        let when = at(FRIDAY_22_UTC);
        let mut u = user("US/Eastern");
        u.last_notified = Some(when - Duration::hours(4));
        assert_eq!(evaluate(&u, when, false, no_updates).unwrap(), Decision::RecentlyNotified);
    }

    #[test]
    fn cooldown_boundary_is_strict() {
        let when = at(FRIDAY_22_UTC);
        assert!(!is_cooled_down(Some(when - Duration::hours(24)), when));
        assert!(is_cooled_down(
            Some(when - Duration::hours(24) - Duration::seconds(1)),
            when
        ));
        assert!(is_cooled_down(None, when));
    }

    #[test]
    fn an_update_this_week_means_no_reminder() {
        let d = evaluate(&user("US/Eastern"), at(FRIDAY_22_UTC), false, |_| Ok(1)).unwrap();
        assert_eq!(d, Decision::AlreadyReported);
    }

    #[test]
    fn ledger_is_not_consulted_before_the_deadline() {
        let d = evaluate(&user("US/Eastern"), at("2015-02-04T12:00:00Z"), false, |_| {
            panic!("ledger queried for a user who is not late")
        })
        .unwrap();
        assert_eq!(d, Decision::BeforeDeadline);
    }

    #[test]
    fn bad_timezone_fails_only_this_check() {
        let err = evaluate(&user("Atlantis/Capital"), at(FRIDAY_22_UTC), false, no_updates)
            .unwrap_err();
        assert!(matches!(err, ReminderError::Core(CoreError::UnknownTimezone(_))));
    }
}
