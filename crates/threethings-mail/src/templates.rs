//! Message bodies and subjects for everything threethings sends.

use crate::mailer::OutboundMessage;

pub const REMINDER_BODY: &str = "
Hi,

Please reply with your weekly status update! Three simple things that
you did last week, and three things you're planning on doing next week.

Cheers,
Friendly Robot
";

pub const CONFIRM_BODY: &str = "
Thanks! I've got it.

Cheers,
Friendly Robot
";

pub fn reminder_subject(iso_year: i32, week: u32) -> String {
    format!("Status Reminder for Week {week} of {iso_year}")
}

pub fn summary_subject(iso_year: i32, week: u32) -> String {
    format!("Status Summary for Week {week} of {iso_year}")
}

/// The weekly "please send your update" nudge.
pub fn reminder(sender: &str, to: &str, iso_year: i32, week: u32) -> OutboundMessage {
    OutboundMessage {
        from: sender.to_string(),
        to: vec![to.to_string()],
        subject: reminder_subject(iso_year, week),
        body: REMINDER_BODY.to_string(),
        headers: Vec::new(),
    }
}

/// Acknowledge a received update, threaded onto the original message when
/// its id and subject are known.
pub fn confirmation(
    sender: &str,
    to: &str,
    reply_to_id: Option<&str>,
    reply_to_subject: Option<&str>,
) -> OutboundMessage {
    let subject = match reply_to_subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) if s.to_ascii_lowercase().starts_with("re:") => s.to_string(),
        Some(s) => format!("Re: {s}"),
        None => "Got your update!".to_string(),
    };
    let headers = reply_to_id
        .map(|id| vec![("In-Reply-To".to_string(), id.to_string())])
        .unwrap_or_default();
    OutboundMessage {
        from: sender.to_string(),
        to: vec![to.to_string()],
        subject,
        body: CONFIRM_BODY.to_string(),
        headers,
    }
}

/// The compiled weekly digest for one recipient.
pub fn summary(
    sender: &str,
    to: &str,
    iso_year: i32,
    week: u32,
    body: String,
) -> OutboundMessage {
    OutboundMessage {
        from: sender.to_string(),
        to: vec![to.to_string()],
        subject: summary_subject(iso_year, week),
        body,
        headers: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_subject_names_iso_week() {
        let m = reminder("robot@example.com", "a@example.com", 2015, 6);
        assert_eq!(m.subject, "Status Reminder for Week 6 of 2015");
        assert_eq!(m.to, ["a@example.com"]);
    }

    #[test]
    fn confirmation_threads_onto_original() {
        let m = confirmation(
            "robot@example.com",
            "a@example.com",
            Some("<m1@mail>"),
            Some("Status Reminder for Week 6 of 2015"),
        );
        assert_eq!(m.subject, "Re: Status Reminder for Week 6 of 2015");
        assert_eq!(m.header("In-Reply-To"), Some("<m1@mail>"));
    }

    #[test]
    fn confirmation_does_not_stack_re_prefixes() {
        let m = confirmation("robot@example.com", "a@example.com", None, Some("RE: my week"));
        assert_eq!(m.subject, "RE: my week");
        assert!(m.headers.is_empty());
    }

    #[test]
    fn summary_is_addressed_to_one_reader() {
        let m = summary("robot@example.com", "b@example.com", 2015, 6, "digest".to_string());
        assert_eq!(m.to, ["b@example.com"]);
        assert_eq!(m.subject, "Status Summary for Week 6 of 2015");
    }

    #[test]
    fn confirmation_without_subject() {
        let m = confirmation("robot@example.com", "a@example.com", None, Some("   "));
        assert_eq!(m.subject, "Got your update!");
    }
}
