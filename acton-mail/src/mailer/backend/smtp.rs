//! SMTP backend for sending mail
//!
//! Uses the `lettre` crate to relay messages through an SMTP server.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    transport::smtp::{authentication::Credentials, extension::ClientId},
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use tracing::{debug, info, warn};

use super::mime_message::build_message;
use crate::config::SmtpSettings;
use crate::mailer::{Hook, Mailer, MailerError, Message, SendEvent, SendInterceptor, Terminal};

const PROVIDER: &str = "smtp";

/// Port that uses implicit TLS instead of STARTTLS
const SMTPS_PORT: u16 = 465;

/// SMTP mailer
///
/// # Examples
///
/// ```rust,no_run
/// use acton_mail::{config::SmtpSettings, Address, Mailer, Message, SmtpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SmtpClient::new(SmtpSettings {
///     host: "smtp.example.com".to_string(),
///     username: "mailer".to_string(),
///     password: "secret".to_string(),
///     ..SmtpSettings::default()
/// })?;
///
/// let message = Message::new(Address::new("noreply@myapp.com"))
///     .to(Address::new("user@example.com"))
///     .subject("Hello!")
///     .text("Hello, World!");
///
/// client.send(message).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SmtpClient {
    settings: SmtpSettings,
    hook: Arc<Hook>,
}

impl SmtpClient {
    /// Create a client with its own hook
    ///
    /// # Errors
    ///
    /// Returns `MailerError::Config` if no host is configured.
    pub fn new(settings: SmtpSettings) -> Result<Self, MailerError> {
        Self::with_hook(settings, Arc::new(Hook::new()))
    }

    /// Create a client sharing an existing hook
    ///
    /// # Errors
    ///
    /// Returns `MailerError::Config` if no host is configured.
    pub fn with_hook(settings: SmtpSettings, hook: Arc<Hook>) -> Result<Self, MailerError> {
        if settings.host.trim().is_empty() {
            return Err(MailerError::config("smtp host is required"));
        }
        Ok(Self { settings, hook })
    }

    /// The settings this client was built from
    #[must_use]
    pub const fn settings(&self) -> &SmtpSettings {
        &self.settings
    }

    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
        let host = self.settings.host.as_str();

        let mut transport = if !self.settings.tls {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else if self.settings.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| MailerError::config(format!("TLS parameters error: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| MailerError::config(format!("TLS parameters error: {e}")))?
        };

        transport = transport
            .port(self.settings.port)
            .timeout(Some(self.settings.timeout()));

        if !self.settings.username.is_empty() {
            transport = transport.credentials(Credentials::new(
                self.settings.username.clone(),
                self.settings.password.clone(),
            ));
        }

        if let Some(name) = &self.settings.local_name {
            transport = transport.hello_name(ClientId::Domain(name.clone()));
        }

        Ok(transport.build())
    }

    async fn transmit(&self, message: &mut Message) -> Result<(), MailerError> {
        let email = build_message(message).await?;
        let transport = self.create_transport()?;

        debug!(
            provider = PROVIDER,
            host = %self.settings.host,
            port = self.settings.port,
            recipients = message.recipient_count(),
            "relaying message"
        );

        transport.send(email).await.map_err(|e| {
            warn!(provider = PROVIDER, error = %e, "smtp delivery failed");
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

#[async_trait]
impl Mailer for SmtpClient {
    async fn send(&self, message: Message) -> Result<(), MailerError> {
        self.hook.dispatch(message, &Transmit(self)).await
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

impl SendInterceptor for SmtpClient {
    fn on_send(&self) -> &Hook {
        &self.hook
    }
}

struct Transmit<'a>(&'a SmtpClient);

#[async_trait]
impl Terminal for Transmit<'_> {
    async fn call(&self, event: &mut SendEvent) -> Result<(), MailerError> {
        self.0.transmit(&mut event.message).await
    }
}
