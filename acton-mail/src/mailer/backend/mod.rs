//! Mail providers
//!
//! - [`SendmailClient`]: pipes into the local `sendmail` binary (default)
//! - [`SmtpClient`]: relays through an SMTP server
//! - [`ResendClient`]: posts JSON to the Resend HTTP API

mod mime_message;
mod resend;
mod sendmail;
mod smtp;

pub use mime_message::build_message;
pub use resend::{ResendAttachment, ResendClient, ResendPayload};
pub use sendmail::SendmailClient;
pub use smtp::SmtpClient;
