//! Mailer error types

use thiserror::Error;

/// Errors that can occur when sending mail through a provider
#[derive(Debug, Error)]
pub enum MailerError {
    /// Missing credentials, unknown provider or otherwise unusable settings
    #[error("mailer configuration error: {0}")]
    Config(String),

    /// An attachment stream could not be read
    #[error("failed to prepare attachment {filename}: {source}")]
    Attachment {
        /// Filename of the offending attachment
        filename: String,
        /// Underlying read error
        #[source]
        source: std::io::Error,
    },

    /// The provider payload could not be serialized
    #[error("failed to serialize mail payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The MIME message could not be assembled
    #[error("failed to build mail message: {0}")]
    Build(String),

    /// An address was rejected by the wire format
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    /// The provider could not be reached
    #[error("mail transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status
    #[error("{provider} API error ({status}): {message}")]
    Rejected {
        /// Provider name
        provider: &'static str,
        /// HTTP status code
        status: u16,
        /// Decoded provider message, or the raw response body
        message: String,
    },

    /// A send hook aborted delivery
    #[error("send intercepted: {0}")]
    Intercepted(String),
}

impl MailerError {
    /// Create a configuration error from a string message
    #[must_use]
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// Create a transport error from a string message
    #[must_use]
    pub fn transport<T: Into<String>>(msg: T) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a message build error from a string message
    #[must_use]
    pub fn build<T: Into<String>>(msg: T) -> Self {
        Self::Build(msg.into())
    }

    /// Create an interception error from a string message
    #[must_use]
    pub fn intercepted<T: Into<String>>(msg: T) -> Self {
        Self::Intercepted(msg.into())
    }

    /// HTTP status returned by the provider, if it rejected the message
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller-side retry could plausibly succeed
    ///
    /// The mailer itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
