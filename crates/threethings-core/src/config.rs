use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const DEFAULT_PORT: u16 = 6543;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
pub const DEFAULT_SENDER: &str = "3things Status Updates <status-update@localhost>";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 900;

/// Top-level config (threethings.toml + THREETHINGS_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThreeThingsConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Which outbound transport delivers reminder, confirmation and digest mail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MailProvider {
    Mailgun,
    /// Write messages to the log instead of sending them.
    #[default]
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// `From:` header on every outbound message.
    #[serde(default = "default_sender")]
    pub sender: String,
    #[serde(default)]
    pub provider: MailProvider,
    pub mailgun: Option<MailgunConfig>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: default_sender(),
            provider: MailProvider::default(),
            mailgun: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailgunConfig {
    /// Sending domain, e.g. "in.example.com".
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_mailgun_base_url")]
    pub base_url: String,
    /// Webhook signing key. When set, inbound posts must carry a valid signature.
    pub signing_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Run the background reminder loop inside `serve`.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_sender() -> String {
    DEFAULT_SENDER.to_string()
}
fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}
fn default_mailgun_base_url() -> String {
    "https://api.mailgun.net".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.threethings/threethings.db", home)
}

impl ThreeThingsConfig {
    /// Load config from a TOML file with env var overrides, then validate it.
    ///
    /// Precedence, lowest first: built-in defaults, the TOML file, the legacy
    /// `DATABASE_URL` / `MAILGUN_API_KEY` variables, `THREETHINGS_*` variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(%path, "loading config");

        let config: ThreeThingsConfig = Self::figment(&path)
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(ThreeThingsConfig::default()))
            .merge(Toml::file(path))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL", "MAILGUN_API_KEY"])
                    .map(|key| {
                        if key.as_str().eq_ignore_ascii_case("DATABASE_URL") {
                            "database.path".into()
                        } else {
                            "mail.mailgun.api_key".into()
                        }
                    }),
            )
            .merge(Env::prefixed("THREETHINGS_").split("__"))
    }

    /// Reject settings that would only fail later, at send or tick time.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(CoreError::Config("database.path must not be empty".into()));
        }
        if !self.mail.sender.contains('@') {
            return Err(CoreError::Config(format!(
                "mail.sender is not an email address: {}",
                self.mail.sender
            )));
        }
        if self.mail.provider == MailProvider::Mailgun {
            match &self.mail.mailgun {
                None => {
                    return Err(CoreError::Config(
                        "mail.provider = \"mailgun\" requires a [mail.mailgun] section".into(),
                    ))
                }
                Some(mg) if mg.domain.is_empty() || mg.api_key.is_empty() => {
                    return Err(CoreError::Config(
                        "mail.mailgun.domain and mail.mailgun.api_key must be set".into(),
                    ))
                }
                Some(_) => {}
            }
        }
        if self.reminders.check_interval_secs == 0 {
            return Err(CoreError::Config(
                "reminders.check_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.threethings/threethings.toml", home)
}
