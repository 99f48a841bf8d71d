use chrono::{DateTime, Duration, Utc};
use threethings_core::time::parse_instant;
use threethings_mail::MemoryMailer;
use threethings_reminders::{
    run_notifications, send_summary, to_notify, NotifyOptions, ReminderError,
};
use threethings_users::{NewStatusUpdate, NewUser, Store};

const SENDER: &str = "3things <status-update@example.com>";
const BOSTON: &str = "boston@example.com";
const SINGAPORE: &str = "singapore@example.com";

fn at(s: &str) -> DateTime<Utc> {
    parse_instant(s).unwrap()
}

fn friday_evening() -> DateTime<Utc> {
    at("2015-02-06T22:00:00Z")
}

fn two_users() -> Store {
    let store = Store::open_in_memory().unwrap();
    for (email, tz) in [(BOSTON, "US/Eastern"), (SINGAPORE, "Singapore")] {
        store
            .add_user(&NewUser {
                email_address: email.to_string(),
                display_name: None,
                timezone: tz.to_string(),
            })
            .unwrap();
    }
    store
}

fn due(store: &Store, when: DateTime<Utc>) -> Vec<String> {
    store.with_conn(|conn| {
        to_notify(conn, Some(when), false)
            .map(|sel| sel.map(|r| r.unwrap().email_address).collect::<Vec<_>>())
    })
    .unwrap()
}

#[test]
fn both_users_are_due_on_friday_evening_utc() {
    let store = two_users();
    assert_eq!(due(&store, friday_evening()), [BOSTON, SINGAPORE]);
}

#[test]
fn only_singapore_is_due_on_friday_morning_utc() {
    let store = two_users();
    assert_eq!(due(&store, at("2015-02-06T08:00:00Z")), [SINGAPORE]);
}

#[test]
fn nobody_is_due_four_hours_after_a_reminder() {
    let store = two_users();
    let when = friday_evening();
    store
        .mark_notified(&[BOSTON.to_string(), SINGAPORE.to_string()], when - Duration::hours(4))
        .unwrap();
    assert!(due(&store, when).is_empty());
}

#[test]
fn an_update_twelve_hours_ago_counts_for_this_week() {
    let store = two_users();
    let when = friday_evening();
    store
        .record_updates(&[NewStatusUpdate {
            email_address: SINGAPORE.to_string(),
            status: "Shipped the thing".to_string(),
            html: None,
            created_at: when - Duration::hours(12),
        }])
        .unwrap();
    assert_eq!(due(&store, when), [BOSTON]);
}

#[test]
fn muted_user_is_skipped() {
    let store = two_users();
    store.set_notifications(BOSTON, false).unwrap();
    assert_eq!(due(&store, friday_evening()), [SINGAPORE]);
}

#[tokio::test]
async fn run_sends_and_records() {
    let store = two_users();
    let mailer = MemoryMailer::new();
    let when = friday_evening();

    let report = run_notifications(&store, &mailer, SENDER, when, NotifyOptions::default())
        .await
        .unwrap();
    assert_eq!(report.notified, [BOSTON, SINGAPORE]);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|m| m.subject == "Status Reminder for Week 6 of 2015" && m.from == SENDER));
    assert_eq!(store.get_user(BOSTON).unwrap().unwrap().last_notified, Some(when));

    // A second pass an hour later finds everyone cooling down.
    let again = run_notifications(
        &store,
        &mailer,
        SENDER,
        when + Duration::hours(1),
        NotifyOptions::default(),
    )
    .await
    .unwrap();
    assert!(again.due.is_empty());
    assert_eq!(mailer.sent().len(), 2);
}

#[tokio::test]
async fn failed_send_only_leaves_that_user_due() {
    let store = two_users();
    let mailer = MemoryMailer::rejecting(SINGAPORE);
    let when = friday_evening();

    let report = run_notifications(&store, &mailer, SENDER, when, NotifyOptions::default())
        .await
        .unwrap();
    assert_eq!(report.notified, [BOSTON]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, SINGAPORE);
    assert_eq!(store.get_user(BOSTON).unwrap().unwrap().last_notified, Some(when));
    assert!(store.get_user(SINGAPORE).unwrap().unwrap().last_notified.is_none());
    assert_eq!(due(&store, when + Duration::minutes(15)), [SINGAPORE]);
}

#[tokio::test]
async fn engine_passes_do_not_repeat_reminders_while_one_address_bounces() {
    let store = two_users();
    let mailer = MemoryMailer::rejecting(SINGAPORE);
    let start = friday_evening();

    for pass in 0..4 {
        let when = start + Duration::minutes(15 * pass);
        run_notifications(&store, &mailer, SENDER, when, NotifyOptions::default())
            .await
            .unwrap();
    }
    let to_boston = mailer
        .sent()
        .iter()
        .filter(|m| m.to == [BOSTON])
        .count();
    assert_eq!(to_boston, 1);
    assert!(store.get_user(SINGAPORE).unwrap().unwrap().last_notified.is_none());
}

#[tokio::test]
async fn dry_run_reports_without_sending() {
    let store = two_users();
    let mailer = MemoryMailer::new();
    let opts = NotifyOptions {
        force: false,
        dry_run: true,
    };
    let report = run_notifications(&store, &mailer, SENDER, friday_evening(), opts)
        .await
        .unwrap();
    assert_eq!(report.due, [BOSTON, SINGAPORE]);
    assert!(report.notified.is_empty());
    assert!(mailer.sent().is_empty());
    assert!(store.get_user(BOSTON).unwrap().unwrap().last_notified.is_none());
}

#[tokio::test]
async fn force_reminds_everyone_even_after_a_reminder() {
    let store = two_users();
    let mailer = MemoryMailer::new();
    let when = at("2015-02-04T12:00:00Z");
    store.mark_notified(&[BOSTON.to_string()], when).unwrap();
    let opts = NotifyOptions {
        force: true,
        dry_run: false,
    };
    let report = run_notifications(&store, &mailer, SENDER, when, opts).await.unwrap();
    assert_eq!(report.notified.len(), 2);
}

#[tokio::test]
async fn broken_timezone_is_reported_and_others_still_run() {
    let store = two_users();
    store
        .with_conn(|conn| {
            conn.execute(
                "UPDATE users SET timezone = 'Nowhere/Special' WHERE email_address = ?1",
                [BOSTON],
            )
        })
        .unwrap();
    let mailer = MemoryMailer::new();
    let report = run_notifications(&store, &mailer, SENDER, friday_evening(), NotifyOptions::default())
        .await
        .unwrap();
    assert_eq!(report.notified, [SINGAPORE]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].0, BOSTON);
}

#[tokio::test]
async fn summary_goes_to_every_active_user() {
    let store = two_users();
    let when = friday_evening();
    store
        .record_updates(&[NewStatusUpdate {
            email_address: BOSTON.to_string(),
            status: "1. wrote tests".to_string(),
            html: None,
            created_at: when - Duration::hours(3),
        }])
        .unwrap();
    let mailer = MemoryMailer::new();
    let summary = send_summary(&store, &mailer, SENDER, when).await.unwrap();
    assert!(summary.users_without_updates().contains(SINGAPORE));

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, [BOSTON]);
    assert_eq!(sent[1].to, [SINGAPORE]);
    for message in &sent {
        assert_eq!(message.subject, "Status Summary for Week 6 of 2015");
        assert!(message.body.contains("1. wrote tests"));
    }
}

#[tokio::test]
async fn summary_bounce_does_not_stop_other_recipients() {
    let store = two_users();
    let mailer = MemoryMailer::rejecting(BOSTON);
    let err = send_summary(&store, &mailer, SENDER, friday_evening())
        .await
        .unwrap_err();
    assert!(matches!(err, ReminderError::Mail(_)));
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, [SINGAPORE]);
}
