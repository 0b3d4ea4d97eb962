//! acton-mail: pluggable outbound mail for Rust services
//!
//! A single [`Mailer`] trait fronts three providers:
//! - **sendmail**: the local `sendmail` binary (default)
//! - **SMTP**: any SMTP relay, via `lettre`
//! - **Resend**: the Resend HTTP API
//!
//! Every provider wraps its transmission in a [`Hook`], so application code
//! can observe, rewrite or suppress sends without touching the provider.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use acton_mail::{config::MailerSettings, Address, Mailer, MailerSelector, Message, SendInterceptor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     acton_mail::observability::init()?;
//!
//!     let mailer = MailerSelector::new(&MailerSettings::load()?)?;
//!     mailer.on_send().register(acton_mail::observability::SendLogger::new("app"));
//!
//!     let message = Message::new(Address::with_name("Acme", "noreply@acme.test"))
//!         .to(Address::new("user@example.com"))
//!         .subject("Welcome")
//!         .html("<h1>Welcome!</h1><p>Thanks for signing up.</p>")
//!         .attach_bytes("terms.pdf", std::fs::read("terms.pdf")?);
//!
//!     mailer.send(message).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! See [`config`] for the file and environment layout.

#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod mailer;
pub mod mime;
pub mod observability;

pub use config::{MailerSettings, ResendSettings, SendmailSettings, SmtpSettings};
pub use mailer::{
    Address, HandlerId, Hook, HookFuture, Mailer, MailerError, MailerSelector, Message, Next,
    ProviderKind, ResendClient, SendEvent, SendHandler, SendInterceptor, SendmailClient,
    SmtpClient, Terminal,
};
