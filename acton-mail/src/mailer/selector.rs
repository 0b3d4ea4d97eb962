//! Provider selection
//!
//! [`MailerSelector`] builds the provider named by
//! [`MailerSettings::provider`] and can swap it at runtime. All providers it
//! builds share its hook, so observers registered once keep running after a
//! switch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::{
    Hook, Mailer, MailerError, Message, ResendClient, SendInterceptor, SendmailClient, SmtpClient,
};
use crate::config::MailerSettings;

/// Known providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    /// Local `sendmail` binary
    #[default]
    Sendmail,
    /// SMTP relay
    Smtp,
    /// Resend HTTP API
    Resend,
}

impl ProviderKind {
    /// Canonical identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sendmail => "sendmail",
            Self::Smtp => "smtp",
            Self::Resend => "resend",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = MailerError;

    /// Parse a provider identifier; an empty identifier means sendmail
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        if id.is_empty() || id.eq_ignore_ascii_case("sendmail") {
            Ok(Self::Sendmail)
        } else if id.eq_ignore_ascii_case("smtp") {
            Ok(Self::Smtp)
        } else if id.eq_ignore_ascii_case("resend") {
            Ok(Self::Resend)
        } else {
            Err(MailerError::config(format!("unknown mail provider: {id:?}")))
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Active {
    kind: ProviderKind,
    mailer: Arc<dyn Mailer>,
}

/// Mailer that delegates to the configured provider
///
/// # Examples
///
/// ```rust
/// use acton_mail::{config::MailerSettings, MailerSelector, ProviderKind};
///
/// let mut settings = MailerSettings::default();
/// let selector = MailerSelector::new(&settings)?;
/// assert_eq!(selector.provider(), ProviderKind::Sendmail);
///
/// settings.provider = "resend".to_string();
/// settings.resend.api_key = "re_123".to_string();
/// selector.reload(&settings)?;
/// assert_eq!(selector.provider(), ProviderKind::Resend);
/// # Ok::<(), acton_mail::MailerError>(())
/// ```
pub struct MailerSelector {
    hook: Arc<Hook>,
    active: RwLock<Active>,
}

impl MailerSelector {
    /// Build the provider named in `settings`
    ///
    /// # Errors
    ///
    /// Returns `MailerError::Config` for an unknown provider or settings the
    /// provider cannot be built from.
    pub fn new(settings: &MailerSettings) -> Result<Self, MailerError> {
        let hook = Arc::new(Hook::new());
        let active = build(settings, &hook)?;
        info!(provider = %active.kind, "mail provider selected");

        Ok(Self {
            hook,
            active: RwLock::new(active),
        })
    }

    /// Switch to the provider named in `settings`
    ///
    /// The current provider stays active if the new one cannot be built.
    /// Sends already in progress finish on the provider they started with.
    ///
    /// # Errors
    ///
    /// See [`MailerSelector::new`].
    pub fn reload(&self, settings: &MailerSettings) -> Result<(), MailerError> {
        let next = build(settings, &self.hook)?;
        let kind = next.kind;
        let previous = std::mem::replace(&mut *self.active.write(), next);
        info!(from = %previous.kind, to = %kind, "mail provider reloaded");
        Ok(())
    }

    /// The active provider
    #[must_use]
    pub fn provider(&self) -> ProviderKind {
        self.active.read().kind
    }

    fn current(&self) -> Arc<dyn Mailer> {
        Arc::clone(&self.active.read().mailer)
    }
}

impl fmt::Debug for MailerSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailerSelector")
            .field("provider", &self.provider())
            .field("hook", &self.hook)
            .finish()
    }
}

#[async_trait]
impl Mailer for MailerSelector {
    async fn send(&self, message: Message) -> Result<(), MailerError> {
        let mailer = self.current();
        debug!(provider = mailer.provider_name(), "dispatching send");
        mailer.send(message).await
    }

    fn provider_name(&self) -> &'static str {
        self.provider().as_str()
    }
}

impl SendInterceptor for MailerSelector {
    fn on_send(&self) -> &Hook {
        &self.hook
    }
}

fn build(settings: &MailerSettings, hook: &Arc<Hook>) -> Result<Active, MailerError> {
    let kind: ProviderKind = settings.provider.parse()?;
    let hook = Arc::clone(hook);

    let mailer: Arc<dyn Mailer> = match kind {
        ProviderKind::Sendmail => Arc::new(SendmailClient::with_hook(
            settings.sendmail.clone(),
            hook,
        )),
        ProviderKind::Smtp => Arc::new(SmtpClient::with_hook(settings.smtp.clone(), hook)?),
        ProviderKind::Resend => Arc::new(ResendClient::with_hook(settings.resend.clone(), hook)?),
    };

    Ok(Active { kind, mailer })
}
