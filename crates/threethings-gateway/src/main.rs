use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use threethings_core::config::DEFAULT_TIMEZONE;
use threethings_core::time::parse_instant;
use threethings_core::ThreeThingsConfig;
use threethings_reminders::{
    eligibility::Decision, selector::explain, NotifyOptions, ReminderEngine, WeeklySummary,
};
use threethings_users::{NewUser, Store, StoreError};
use tracing::{info, warn};

mod app;
mod http;

#[derive(Debug, Parser)]
#[command(name = "threethings", version, about = "Weekly status update reminders")]
struct Cli {
    /// Path to threethings.toml (default: ~/.threethings/threethings.toml).
    #[arg(long, global = true, env = "THREETHINGS_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the webhook server and the reminder engine.
    Serve,
    AddUser {
        email: String,
        #[arg(long, default_value = DEFAULT_TIMEZONE)]
        timezone: String,
        #[arg(long)]
        name: Option<String>,
    },
    RemoveUser {
        email: String,
    },
    /// Stop reminding a user.
    Mute {
        email: String,
    },
    Unmute {
        email: String,
    },
    ListUsers,
    /// Run one notification pass.
    Notify {
        /// Reference instant (RFC 3339 with offset); defaults to now.
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        force: bool,
        /// Show who is due and why, without sending.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the digest for the week containing `--at`.
    Summary {
        #[arg(long)]
        at: Option<String>,
        /// Email the digest to every active user.
        #[arg(long)]
        send: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threethings=info,tower_http=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Some(path) = cli.config.as_deref() {
        if !std::path::Path::new(path).exists() {
            warn!(%path, "config file not found, using defaults");
        }
    }
    let config = ThreeThingsConfig::load(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::AddUser {
            email,
            timezone,
            name,
        } => {
            let store = open_store(&config)?;
            store.add_user(&NewUser {
                email_address: email.clone(),
                display_name: name,
                timezone,
            })?;
            println!("Added: {email}");
            Ok(())
        }
        Command::RemoveUser { email } => {
            let store = open_store(&config)?;
            match store.remove_user(&email) {
                Ok(()) => println!("Removed: {email}"),
                Err(StoreError::NotFound(_)) => println!("No such user: {email}"),
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }
        Command::Mute { email } => set_notifications(&config, &email, false),
        Command::Unmute { email } => set_notifications(&config, &email, true),
        Command::ListUsers => {
            let store = open_store(&config)?;
            for user in store.list_users()? {
                let last = user
                    .last_notified
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}\t{}\t{}\tlast notified: {}",
                    user.email_address,
                    user.timezone,
                    if user.notifications_on { "on" } else { "muted" },
                    last
                );
            }
            Ok(())
        }
        Command::Notify { at, force, dry_run } => {
            let when = reference_instant(at.as_deref())?;
            let store = open_store(&config)?;
            if dry_run {
                print_decisions(&store, when, force)?;
                return Ok(());
            }
            let mailer = threethings_mail::from_config(&config.mail)?;
            let report = threethings_reminders::run_notifications(
                &store,
                mailer.as_ref(),
                &config.mail.sender,
                when,
                NotifyOptions {
                    force,
                    dry_run: false,
                },
            )
            .await?;
            for email in &report.notified {
                println!("Notified: {email}");
            }
            for (email, reason) in &report.errors {
                println!("Skipped: {email} ({reason})");
            }
            Ok(())
        }
        Command::Summary { at, send } => {
            let when = reference_instant(at.as_deref())?;
            let store = open_store(&config)?;
            let summary = if send {
                let mailer = threethings_mail::from_config(&config.mail)?;
                threethings_reminders::send_summary(
                    &store,
                    mailer.as_ref(),
                    &config.mail.sender,
                    when,
                )
                .await?
            } else {
                store.with_conn(|conn| WeeklySummary::compile(conn, when))?
            };
            print!("{}", summary.render());
            Ok(())
        }
    }
}

async fn serve(config: ThreeThingsConfig) -> anyhow::Result<()> {
    let store = Arc::new(open_store(&config)?);
    let mailer = threethings_mail::from_config(&config.mail)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine = if config.reminders.enabled {
        // separate connection so webhook requests never queue behind a pass
        let engine_store = Arc::new(Store::open(&config.database.path)?);
        let engine = ReminderEngine::new(
            engine_store,
            Arc::clone(&mailer),
            config.mail.sender.clone(),
            Duration::from_secs(config.reminders.check_interval_secs),
        );
        Some(tokio::spawn(engine.run(shutdown_rx)))
    } else {
        info!("reminder engine disabled");
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let state = Arc::new(app::AppState::new(config, store, mailer));
    let router = app::build_router(state);

    info!("threethings listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = engine {
        let _ = handle.await;
    }
    Ok(())
}

fn open_store(config: &ThreeThingsConfig) -> anyhow::Result<Store> {
    let path = &config.database.path;
    ensure_parent_dir(path);
    info!(%path, "opening SQLite database");
    Store::open(path).with_context(|| format!("opening database {path}"))
}

fn set_notifications(config: &ThreeThingsConfig, email: &str, on: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    match store.set_notifications(email, on) {
        Ok(()) => {
            println!("{}: {email}", if on { "Unmuted" } else { "Muted" });
            Ok(())
        }
        Err(StoreError::NotFound(_)) => {
            println!("No such user: {email}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn reference_instant(at: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match at {
        Some(s) => Ok(parse_instant(s)?),
        None => Ok(Utc::now()),
    }
}

fn print_decisions(store: &Store, when: DateTime<Utc>, force: bool) -> anyhow::Result<()> {
    let decisions = store.with_conn(|conn| explain(conn, when, force))?;
    for (user, decision) in decisions {
        match decision {
            Ok(d @ (Decision::Forced | Decision::Due)) => {
                println!("Would notify: {} ({d:?})", user.email_address)
            }
            Ok(d) => println!("Skip: {} ({d:?})", user.email_address),
            Err(e) => println!("Error: {} ({e})", user.email_address),
        }
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
