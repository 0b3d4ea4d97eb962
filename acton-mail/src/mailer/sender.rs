//! Mailer trait abstraction
//!
//! This module defines the core `Mailer` trait that all providers implement,
//! plus the optional `SendInterceptor` capability for providers with a hook.

use async_trait::async_trait;

use super::{Hook, MailerError, Message};

/// Trait for sending mail
///
/// Implemented by every provider (sendmail, SMTP, Resend) and by the
/// [`MailerSelector`](super::MailerSelector) that fronts them.
///
/// # Examples
///
/// ```rust,no_run
/// use acton_mail::{Address, Mailer, Message, ResendClient, ResendSettings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = ResendClient::new(ResendSettings::with_api_key("re_123"))?;
///
/// let message = Message::new(Address::new("noreply@myapp.com"))
///     .to(Address::new("user@example.com"))
///     .subject("Hello!")
///     .text("Hello, World!");
///
/// mailer.send(message).await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a message
    ///
    /// Either the provider accepts the whole message or an error is returned;
    /// there is no partial success.
    ///
    /// # Errors
    ///
    /// Returns `MailerError` if the message cannot be built, transmitted or is
    /// rejected by the provider.
    async fn send(&self, message: Message) -> Result<(), MailerError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}

/// Mailers whose sends can be intercepted
pub trait SendInterceptor {
    /// The hook wrapped around every send; always the same instance
    fn on_send(&self) -> &Hook;
}
