//! Calendar helpers shared by the stores and the reminder logic.
//!
//! Every instant that crosses a crate boundary is a `DateTime<Utc>`; local
//! wall-clock time only exists transiently while a user's deadline is checked.

use chrono::{
    DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{CoreError, Result};

/// Offset from Monday 00:00 UTC to the start of a week window. Early-Monday
/// replies still belong to the previous week's digest.
pub const WINDOW_START_OFFSET_SECS: i64 = 17 * 3600 + 1;

/// Length of a week window measured from its start (7 days + 19 hours).
pub const WINDOW_LENGTH_SECS: i64 = (7 * 24 + 19) * 3600;

/// Resolve an IANA timezone name such as `America/Los_Angeles` or `Singapore`.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::UnknownTimezone(name.to_string()))
}

/// Express `when` in the wall-clock time of the named timezone.
pub fn in_local_time(when: DateTime<Utc>, timezone: &str) -> Result<DateTime<Tz>> {
    let tz = resolve_timezone(timezone)?;
    Ok(when.with_timezone(&tz))
}

/// Parse an instant supplied as text (CLI flags, payloads).
///
/// The input must carry an explicit offset (`Z` or `+hh:mm`); a bare local
/// date-time is rejected with [`CoreError::NaiveInstant`].
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if NaiveDateTime::parse_from_str(trimmed, fmt).is_ok() {
            return Err(CoreError::NaiveInstant(trimmed.to_string()));
        }
    }
    Err(CoreError::InvalidInstant {
        input: trimmed.to_string(),
        reason: "expected RFC 3339, e.g. 2015-02-06T22:00:00Z".to_string(),
    })
}

/// Convert a unix timestamp in (possibly fractional) seconds to UTC.
///
/// Instants outside years 0000..=9999 are refused; they cannot be stored in
/// the fixed-width text form.
pub fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos)
        .single()
        .filter(|dt| (0..=9999).contains(&dt.year()))
}

/// Fixed-width storage form, so that SQLite string order is time order.
pub fn format_timestamp(when: &DateTime<Utc>) -> String {
    when.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(stored: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(stored).map(|dt| dt.with_timezone(&Utc))
}

/// The padded span of time whose status updates count toward one ISO week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    pub iso_year: i32,
    pub week: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WeekWindow {
    /// Window for the ISO week (in UTC) that contains `when`.
    pub fn containing(when: DateTime<Utc>) -> Self {
        let date = when.date_naive();
        let iso = date.iso_week();
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let start = monday.and_time(NaiveTime::MIN).and_utc()
            + Duration::seconds(WINDOW_START_OFFSET_SECS);
        Self {
            iso_year: iso.year(),
            week: iso.week(),
            start,
            end: start + Duration::seconds(WINDOW_LENGTH_SECS),
        }
    }

    /// Both ends are inclusive.
    pub fn contains(&self, when: &DateTime<Utc>) -> bool {
        *when >= self.start && *when <= self.end
    }
}
