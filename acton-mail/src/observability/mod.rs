//! Observability (logging)
//!
//! Structured logging via `tracing`, plus a [`SendLogger`] hook handler that
//! records every send passing through a mailer.

use async_trait::async_trait;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::mailer::{MailerError, Next, SendEvent, SendHandler};

/// Initialize logging
///
/// Sets up:
/// - Structured logging with JSON formatting (production) or pretty formatting (dev)
/// - Environment-based log level filtering (`RUST_LOG`)
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use acton_mail::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Application started");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("debug,acton_mail=trace")
        } else {
            EnvFilter::new("info")
        }
    });

    #[cfg(debug_assertions)]
    {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    #[cfg(not(debug_assertions))]
    {
        // JSON formatting for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    }

    Ok(())
}

/// Hook handler that logs each send and its outcome
///
/// Logs addresses and subject only, never bodies.
///
/// ```rust
/// use acton_mail::{observability::SendLogger, Hook};
///
/// let hook = Hook::new();
/// hook.register(SendLogger::new("cli"));
/// ```
#[derive(Debug, Clone)]
pub struct SendLogger {
    source: String,
}

impl SendLogger {
    /// Create a logger tagging entries with `source`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl SendHandler for SendLogger {
    async fn handle(&self, event: &mut SendEvent, next: Next<'_>) -> Result<(), MailerError> {
        {
            let message = &event.message;
            info!(
                source = %self.source,
                from = %message.from,
                recipients = message.recipient_count(),
                attachments = message.attachments.len() + message.inline_attachments.len(),
                subject = %message.subject,
                "sending email"
            );
        }

        let result = next.run(event).await;
        if let Err(e) = &result {
            warn!(source = %self.source, error = %e, retryable = e.is_retryable(), "send failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::mailer::{Address, Hook, Message, Terminal};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    #[async_trait]
    impl Terminal for Counting {
        async fn call(&self, _event: &mut SendEvent) -> Result<(), MailerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(MailerError::transport("connection reset"))
        }
    }

    #[tokio::test]
    async fn test_send_logger_passes_through() {
        let hook = Hook::new();
        hook.register(SendLogger::new("test"));
        let terminal = Counting::default();

        let message = Message::new(Address::new("a@example.com")).to(Address::new("b@example.com"));
        let err = hook.dispatch(message, &terminal).await.unwrap_err();

        assert_eq!(terminal.0.load(Ordering::SeqCst), 1);
        assert!(matches!(err, MailerError::Transport(_)));
    }
}
