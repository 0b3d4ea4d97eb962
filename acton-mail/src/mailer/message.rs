//! Canonical, provider-agnostic message model
//!
//! A [`Message`] is what callers hand to a [`Mailer`](super::Mailer). Providers
//! translate it into their own wire format; nothing in here knows about any
//! particular provider.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tracing::debug;

use super::MailerError;
use crate::mime;

/// A readable attachment body
///
/// Streams are read exactly once, during the `send` call that receives them.
pub type AttachmentReader = Box<dyn AsyncRead + Send + Unpin>;

/// Attachments keyed by filename
pub type Attachments = BTreeMap<String, AttachmentReader>;

/// Characters that force a display name to be quoted (RFC 5322 specials)
const NAME_SPECIALS: &[char] = &[
    '(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"',
];

/// A single mailbox: optional display name plus address
///
/// ```rust
/// use acton_mail::Address;
///
/// let plain = Address::new("user@example.com");
/// assert_eq!(plain.to_string(), "user@example.com");
///
/// let named = Address::with_name("Test", "test@example.com");
/// assert_eq!(named.to_string(), "Test <test@example.com>");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    /// Display name (may be empty)
    #[serde(default)]
    pub name: String,

    /// Email address (`local@domain`)
    pub address: String,
}

impl Address {
    /// Create an address without a display name
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            address: address.into(),
        }
    }

    /// Create an address with a display name
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// The part after `@`, if the address contains exactly one `@`
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        let mut parts = self.address.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(domain), None) => Some(domain),
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return f.write_str(&self.address);
        }

        if self.name.contains(NAME_SPECIALS) {
            let escaped = self.name.replace('\\', "\\\\").replace('"', "\\\"");
            write!(f, "\"{escaped}\" <{}>", self.address)
        } else {
            write!(f, "{} <{}>", self.name, self.address)
        }
    }
}

impl FromStr for Address {
    type Err = MailerError;

    /// Parse `addr` or `Name <addr>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mailbox: lettre::message::Mailbox = s
            .parse()
            .map_err(|_| MailerError::InvalidAddress(s.to_string()))?;
        Ok(mailbox.into())
    }
}

impl From<lettre::message::Mailbox> for Address {
    fn from(mailbox: lettre::message::Mailbox) -> Self {
        Self {
            name: mailbox.name.unwrap_or_default(),
            address: mailbox.email.to_string(),
        }
    }
}

impl TryFrom<&Address> for lettre::message::Mailbox {
    type Error = MailerError;

    fn try_from(address: &Address) -> Result<Self, Self::Error> {
        let email: lettre::Address = address
            .address
            .parse()
            .map_err(|_| MailerError::InvalidAddress(address.address.clone()))?;
        let name = (!address.name.is_empty()).then(|| address.name.clone());
        Ok(Self::new(name, email))
    }
}

/// Render an address list preserving order
#[must_use]
pub fn addresses_to_strings(addresses: &[Address]) -> Vec<String> {
    addresses.iter().map(ToString::to_string).collect()
}

/// An email message
///
/// Use the builder methods to construct messages:
///
/// ```rust
/// use acton_mail::{Address, Message};
///
/// let message = Message::new(Address::with_name("Acme", "noreply@acme.test"))
///     .to(Address::new("user@example.com"))
///     .subject("Welcome!")
///     .html("<h1>Welcome!</h1>")
///     .attach_bytes("terms.txt", b"be nice".to_vec());
///
/// assert_eq!(message.to.len(), 1);
/// assert!(message.attachments.contains_key("terms.txt"));
/// ```
#[derive(Default)]
pub struct Message {
    /// Sender
    pub from: Address,

    /// Primary recipients, in order
    pub to: Vec<Address>,

    /// Carbon-copy recipients, in order
    pub cc: Vec<Address>,

    /// Blind carbon-copy recipients, in order
    pub bcc: Vec<Address>,

    /// Subject line
    pub subject: String,

    /// HTML body (may be empty)
    pub html: String,

    /// Plain text body (may be empty)
    pub text: String,

    /// Custom headers; names compare case-insensitively
    pub headers: HashMap<String, String>,

    /// Regular attachments
    pub attachments: Attachments,

    /// Attachments meant to be referenced from the HTML body
    pub inline_attachments: Attachments,
}

impl Message {
    /// Create a message from the given sender
    #[must_use]
    pub fn new(from: Address) -> Self {
        Self {
            from,
            ..Self::default()
        }
    }

    /// Add a recipient (To)
    #[must_use]
    pub fn to(mut self, address: Address) -> Self {
        self.to.push(address);
        self
    }

    /// Add a CC recipient
    #[must_use]
    pub fn cc(mut self, address: Address) -> Self {
        self.cc.push(address);
        self
    }

    /// Add a BCC recipient
    #[must_use]
    pub fn bcc(mut self, address: Address) -> Self {
        self.bcc.push(address);
        self
    }

    /// Set the subject
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Set the HTML body
    #[must_use]
    pub fn html(mut self, body: impl Into<String>) -> Self {
        self.html = body.into();
        self
    }

    /// Set the plain text body
    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.text = body.into();
        self
    }

    /// Set a custom header, replacing any existing header with the same
    /// case-insensitive name
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Attach a stream under `filename`
    #[must_use]
    pub fn attach(
        mut self,
        filename: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        self.attachments.insert(filename.into(), Box::new(reader));
        self
    }

    /// Attach an in-memory buffer under `filename`
    #[must_use]
    pub fn attach_bytes(self, filename: impl Into<String>, data: Vec<u8>) -> Self {
        self.attach(filename, Cursor::new(data))
    }

    /// Attach an inline stream under `filename`
    #[must_use]
    pub fn inline(
        mut self,
        filename: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        self.inline_attachments
            .insert(filename.into(), Box::new(reader));
        self
    }

    /// Attach an inline in-memory buffer under `filename`
    #[must_use]
    pub fn inline_bytes(self, filename: impl Into<String>, data: Vec<u8>) -> Self {
        self.inline(filename, Cursor::new(data))
    }

    /// Look up a header by case-insensitive name
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The text body, or a rendition of the HTML body when no text is set
    ///
    /// HTML that cannot be rendered yields an empty string rather than an error.
    #[must_use]
    pub fn plain_text(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        if self.html.is_empty() {
            return String::new();
        }
        mime::html_to_text(&self.html).unwrap_or_else(|e| {
            debug!(error = %e, "could not derive plain text body from html");
            String::new()
        })
    }

    /// Total number of recipients across To, Cc and Bcc
    #[must_use]
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("bcc", &self.bcc)
            .field("subject", &self.subject)
            .field("html_len", &self.html.len())
            .field("text_len", &self.text.len())
            .field("headers", &self.headers)
            .field("attachments", &self.attachments.keys().collect::<Vec<_>>())
            .field(
                "inline_attachments",
                &self.inline_attachments.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}
