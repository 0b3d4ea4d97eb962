//! Local sendmail backend
//!
//! Pipes the formatted message into the system `sendmail` binary.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{AsyncSendmailTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info, warn};

use super::mime_message::build_message;
use crate::config::SendmailSettings;
use crate::mailer::{Hook, Mailer, MailerError, Message, SendEvent, SendInterceptor, Terminal};

const PROVIDER: &str = "sendmail";

/// Mailer backed by the local `sendmail` command
///
/// This is the provider used when none is configured.
#[derive(Debug)]
pub struct SendmailClient {
    settings: SendmailSettings,
    hook: Arc<Hook>,
}

impl SendmailClient {
    /// Create a client with its own hook
    #[must_use]
    pub fn new(settings: SendmailSettings) -> Self {
        Self::with_hook(settings, Arc::new(Hook::new()))
    }

    /// Create a client sharing an existing hook
    #[must_use]
    pub const fn with_hook(settings: SendmailSettings, hook: Arc<Hook>) -> Self {
        Self { settings, hook }
    }

    /// The settings this client was built from
    #[must_use]
    pub const fn settings(&self) -> &SendmailSettings {
        &self.settings
    }

    fn create_transport(&self) -> AsyncSendmailTransport<Tokio1Executor> {
        match &self.settings.command {
            Some(command) => AsyncSendmailTransport::new_with_command(command),
            None => AsyncSendmailTransport::new(),
        }
    }

    async fn transmit(&self, message: &mut Message) -> Result<(), MailerError> {
        let email = build_message(message).await?;

        debug!(
            provider = PROVIDER,
            command = ?self.settings.command,
            recipients = message.recipient_count(),
            "piping message to sendmail"
        );

        self.create_transport().send(email).await.map_err(|e| {
            warn!(provider = PROVIDER, error = %e, "sendmail delivery failed");
            MailerError::transport(e.to_string())
        })?;

        info!(
            provider = PROVIDER,
            recipients = message.recipient_count(),
            subject = %message.subject,
            "email sent"
        );
        Ok(())
    }
}

impl Default for SendmailClient {
    fn default() -> Self {
        Self::new(SendmailSettings::default())
    }
}

#[async_trait]
impl Mailer for SendmailClient {
    async fn send(&self, message: Message) -> Result<(), MailerError> {
        self.hook.dispatch(message, &Transmit(self)).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

impl SendInterceptor for SendmailClient {
    fn on_send(&self) -> &Hook {
        &self.hook
    }
}

struct Transmit<'a>(&'a SendmailClient);

#[async_trait]
impl Terminal for Transmit<'_> {
    async fn call(&self, event: &mut SendEvent) -> Result<(), MailerError> {
        self.0.transmit(&mut event.message).await
    }
}
