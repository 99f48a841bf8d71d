use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use threethings_mail::Mailer;
use threethings_users::Store;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::Result;
use crate::notify::{run_notifications, NotifyOptions, NotifyReport};

/// Periodically runs a notification pass against the current time.
///
/// Uses its own [`Store`] so ingestion requests never wait on a pass.
pub struct ReminderEngine {
    store: Arc<Store>,
    mailer: Arc<dyn Mailer>,
    sender: String,
    interval: Duration,
}

impl ReminderEngine {
    pub fn new(
        store: Arc<Store>,
        mailer: Arc<dyn Mailer>,
        sender: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            sender: sender.into(),
            interval,
        }
    }

    /// One pass at `Utc::now()`.
    pub async fn tick(&self) -> Result<NotifyReport> {
        run_notifications(
            &self.store,
            self.mailer.as_ref(),
            &self.sender,
            Utc::now(),
            NotifyOptions::default(),
        )
        .await
    }

    /// Main loop. Runs a pass every `interval` until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "reminder engine started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(report) if !report.notified.is_empty() => {
                            info!(notified = report.notified.len(), "reminders sent");
                        }
                        Ok(_) => {}
                        Err(e) => error!("reminder pass failed: {e}"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("reminder engine shutting down");
                        break;
                    }
                }
            }
        }
    }
}
