//! Outbound mail
//!
//! A [`Message`] is handed to a [`Mailer`]; every provider wraps its
//! transmission in a [`Hook`] so observers can inspect, rewrite or stop a
//! send. [`MailerSelector`] picks the provider from configuration.
//!
//! # Examples
//!
//! ```rust,no_run
//! use acton_mail::{config::MailerSettings, Address, Mailer, MailerSelector, Message};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mailer = MailerSelector::new(&MailerSettings::load()?)?;
//!
//! let message = Message::new(Address::new("noreply@myapp.com"))
//!     .to(Address::new("user@example.com"))
//!     .subject("Welcome!")
//!     .html("<h1>Welcome!</h1>");
//!
//! mailer.send(message).await?;
//! # Ok(())
//! # }
//! ```

mod attachment;
pub mod backend;
mod error;
pub mod headers;
pub mod hook;
mod message;
mod selector;
mod sender;

pub use attachment::read_attachment;
pub use backend::{ResendAttachment, ResendClient, ResendPayload, SendmailClient, SmtpClient};
pub use error::MailerError;
pub use hook::{HandlerId, Hook, HookFuture, Next, SendEvent, SendHandler, Terminal};
pub use message::{addresses_to_strings, Address, AttachmentReader, Attachments, Message};
pub use selector::{MailerSelector, ProviderKind};
pub use sender::{Mailer, SendInterceptor};
