//! Mailer settings
//!
//! Settings are loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `ACTON_MAIL_` prefix, `__` for nesting)
//! 2. The TOML file passed to [`MailerSettings::load_from`] (or `./acton-mail.toml`)
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # acton-mail.toml
//! provider = "resend"
//!
//! [resend]
//! api_key = "re_123"
//! timeout_ms = 10000
//!
//! [smtp]
//! host = "smtp.example.com"
//! port = 587
//! username = "mailer"
//! password = "secret"
//! tls = true
//!
//! [sendmail]
//! command = "/usr/sbin/sendmail"
//! ```
//!
//! The same values can come from the environment, e.g.
//! `ACTON_MAIL_PROVIDER=smtp` or `ACTON_MAIL_RESEND__API_KEY=re_123`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default Resend endpoint
pub const DEFAULT_RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Default settings file looked up by [`MailerSettings::load`]
pub const DEFAULT_CONFIG_FILE: &str = "acton-mail.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ACTON_MAIL_";

/// Resend HTTP API settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResendSettings {
    /// API key sent as a bearer token
    pub api_key: String,

    /// Emails endpoint
    pub endpoint: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl ResendSettings {
    /// Default settings with the given API key
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ResendSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_RESEND_ENDPOINT.to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl fmt::Debug for ResendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendSettings")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// SMTP relay settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    /// SMTP server hostname
    pub host: String,

    /// SMTP server port (usually 587 for STARTTLS, 465 for implicit TLS)
    pub port: u16,

    /// SMTP username; empty disables authentication
    pub username: String,

    /// SMTP password
    pub password: String,

    /// Require TLS (implicit TLS on port 465, STARTTLS otherwise)
    pub tls: bool,

    /// Name announced in `EHLO`; defaults to the local hostname
    pub local_name: Option<String>,

    /// Command timeout in milliseconds
    pub timeout_ms: u64,
}

impl SmtpSettings {
    /// Command timeout as a `Duration`
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            tls: true,
            local_name: None,
            timeout_ms: 30_000,
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("tls", &self.tls)
            .field("local_name", &self.local_name)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Local sendmail settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendmailSettings {
    /// Path to the sendmail binary; `None` uses the system default
    pub command: Option<PathBuf>,
}

/// Complete mailer configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerSettings {
    /// Active provider: `""`/`"sendmail"`, `"smtp"` or `"resend"`
    pub provider: String,

    /// Resend settings
    pub resend: ResendSettings,

    /// SMTP settings
    pub smtp: SmtpSettings,

    /// Sendmail settings
    pub sendmail: SendmailSettings,
}

impl MailerSettings {
    /// Load settings from `./acton-mail.toml` (if present) and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong type.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from a specific file and the environment
    ///
    /// A missing file is not an error; defaults and environment variables
    /// still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default settings cannot be serialized to TOML
    /// - The file contains invalid TOML syntax
    /// - A value fails type conversion
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use acton_mail::config::MailerSettings;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let settings = MailerSettings::load_from("./config/production.toml")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;

        Ok(settings)
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "***"
    }
}
