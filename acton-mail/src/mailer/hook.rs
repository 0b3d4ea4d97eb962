//! Send interception
//!
//! Every provider owns a [`Hook`]: an ordered list of handlers wrapped around
//! the provider's actual transmission. A handler receives the [`SendEvent`] and
//! a [`Next`] handle; it may inspect or rewrite the message, continue the chain
//! with `next.run(event)`, or return without calling it to stop delivery.
//!
//! # Examples
//!
//! ```rust
//! use acton_mail::{Hook, SendEvent};
//!
//! let hook = Hook::new();
//! hook.register_fn(|event: &mut SendEvent, next| {
//!     Box::pin(async move {
//!         event.message.subject = format!("[staging] {}", event.message.subject);
//!         next.run(event).await
//!     })
//! });
//! assert_eq!(hook.len(), 1);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use super::{Message, MailerError};

/// Boxed future returned by closure handlers
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<(), MailerError>> + Send + 'a>>;

/// The value passed through the hook chain for one `send` call
#[derive(Debug)]
pub struct SendEvent {
    /// Message about to be transmitted
    pub message: Message,
}

impl SendEvent {
    /// Wrap a message
    #[must_use]
    pub const fn new(message: Message) -> Self {
        Self { message }
    }

    /// Take the message back out of the event
    #[must_use]
    pub fn into_message(self) -> Message {
        self.message
    }
}

/// A link in the send chain
#[async_trait]
pub trait SendHandler: Send + Sync {
    /// Handle the event; call `next.run(event)` to continue delivery
    async fn handle(&self, event: &mut SendEvent, next: Next<'_>) -> Result<(), MailerError>;
}

/// The end of the chain: the provider's real transmission
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Transmit the event's message
    async fn call(&self, event: &mut SendEvent) -> Result<(), MailerError>;
}

/// Remaining handlers plus the terminal, handed to each handler
pub struct Next<'a> {
    handlers: &'a [Arc<dyn SendHandler>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Compose `handlers` (in order) in front of `terminal`
    #[must_use]
    pub fn new(handlers: &'a [Arc<dyn SendHandler>], terminal: &'a dyn Terminal) -> Self {
        Self { handlers, terminal }
    }

    /// Run the rest of the chain
    ///
    /// # Errors
    ///
    /// Returns whatever the next handler, or the terminal, returns.
    pub async fn run(self, event: &mut SendEvent) -> Result<(), MailerError> {
        match self.handlers.split_first() {
            Some((head, rest)) => head.handle(event, Next::new(rest, self.terminal)).await,
            None => self.terminal.call(event).await,
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

/// Identifies a registered handler so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct HookState {
    next_id: u64,
    handlers: Vec<(HandlerId, Arc<dyn SendHandler>)>,
}

/// Ordered, thread-safe list of send handlers
#[derive(Default)]
pub struct Hook {
    state: RwLock<HookState>,
}

impl Hook {
    /// Create a hook with no handlers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the end of the chain
    pub fn register(&self, handler: impl SendHandler + 'static) -> HandlerId {
        let mut state = self.state.write();
        let id = HandlerId(state.next_id);
        state.next_id += 1;
        state.handlers.push((id, Arc::new(handler)));
        id
    }

    /// Append a closure handler to the end of the chain
    pub fn register_fn<F>(&self, handler: F) -> HandlerId
    where
        F: for<'a> Fn(&'a mut SendEvent, Next<'a>) -> HookFuture<'a> + Send + Sync + 'static,
    {
        self.register(FnHandler(handler))
    }

    /// Remove a handler; returns `false` if it was not registered
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut state = self.state.write();
        let before = state.handlers.len();
        state.handlers.retain(|(existing, _)| *existing != id);
        state.handlers.len() != before
    }

    /// Remove every handler
    pub fn clear(&self) {
        self.state.write().handlers.clear();
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().handlers.len()
    }

    /// Whether no handlers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().handlers.is_empty()
    }

    /// Run the chain for `event`, ending in `terminal`
    ///
    /// Handlers registered while the chain runs apply from the next trigger on.
    ///
    /// # Errors
    ///
    /// Returns the first handler's result (or the terminal's, if every handler
    /// continues).
    pub async fn trigger(
        &self,
        mut event: SendEvent,
        terminal: &dyn Terminal,
    ) -> Result<(), MailerError> {
        let handlers: Vec<Arc<dyn SendHandler>> = self
            .state
            .read()
            .handlers
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        trace!(handlers = handlers.len(), "triggering send hook");
        Next::new(&handlers, terminal).run(&mut event).await
    }

    /// Deliver `message`: straight to `terminal` when no handlers are
    /// registered, through the chain otherwise
    ///
    /// # Errors
    ///
    /// See [`Hook::trigger`].
    pub async fn dispatch(
        &self,
        message: Message,
        terminal: &dyn Terminal,
    ) -> Result<(), MailerError> {
        let event = SendEvent::new(message);
        if self.is_empty() {
            let mut event = event;
            return terminal.call(&mut event).await;
        }
        self.trigger(event, terminal).await
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("handlers", &self.len())
            .finish()
    }
}

struct FnHandler<F>(F);

#[async_trait]
impl<F> SendHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut SendEvent, Next<'a>) -> HookFuture<'a> + Send + Sync,
{
    async fn handle(&self, event: &mut SendEvent, next: Next<'_>) -> Result<(), MailerError> {
        (self.0)(event, next).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::Address;

    #[derive(Default)]
    struct CountingTerminal {
        calls: AtomicUsize,
        last_subject: parking_lot::Mutex<String>,
    }

    #[async_trait]
    impl Terminal for CountingTerminal {
        async fn call(&self, event: &mut SendEvent) -> Result<(), MailerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_subject.lock() = event.message.subject.clone();
            Ok(())
        }
    }

    struct Recorder {
        name: &'static str,
        log: Arc<parking_lot::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl SendHandler for Recorder {
        async fn handle(&self, event: &mut SendEvent, next: Next<'_>) -> Result<(), MailerError> {
            self.log.lock().push(self.name);
            next.run(event).await
        }
    }

    struct Block;

    #[async_trait]
    impl SendHandler for Block {
        async fn handle(&self, _event: &mut SendEvent, _next: Next<'_>) -> Result<(), MailerError> {
            Err(MailerError::intercepted("blocked"))
        }
    }

    fn message() -> Message {
        Message::new(Address::new("from@example.com"))
            .to(Address::new("to@example.com"))
            .subject("Original")
    }

    #[tokio::test]
    async fn test_dispatch_without_handlers_calls_terminal() {
        let hook = Hook::new();
        let terminal = CountingTerminal::default();

        hook.dispatch(message(), &terminal).await.unwrap();

        assert_eq!(terminal.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let hook = Hook::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        hook.register(Recorder { name: "first", log: Arc::clone(&log) });
        hook.register(Recorder { name: "second", log: Arc::clone(&log) });
        let terminal = CountingTerminal::default();

        hook.dispatch(message(), &terminal).await.unwrap();

        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_can_rewrite_message() {
        let hook = Hook::new();
        hook.register_fn(|event: &mut SendEvent, next| {
            Box::pin(async move {
                event.message.subject = "Rewritten".to_string();
                next.run(event).await
            })
        });
        let terminal = CountingTerminal::default();

        hook.dispatch(message(), &terminal).await.unwrap();

        assert_eq!(*terminal.last_subject.lock(), "Rewritten");
    }

    #[tokio::test]
    async fn test_short_circuit_skips_rest_of_chain() {
        let hook = Hook::new();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        hook.register(Block);
        hook.register(Recorder { name: "after", log: Arc::clone(&log) });
        let terminal = CountingTerminal::default();

        let result = hook.dispatch(message(), &terminal).await;

        assert!(matches!(result, Err(MailerError::Intercepted(_))));
        assert!(log.lock().is_empty());
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_circuit_with_ok_reports_success() {
        let hook = Hook::new();
        hook.register_fn(|_event: &mut SendEvent, _next| Box::pin(async { Ok(()) }));
        let terminal = CountingTerminal::default();

        assert!(hook.dispatch(message(), &terminal).await.is_ok());
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister() {
        let hook = Hook::new();
        let id = hook.register(Block);
        assert_eq!(hook.len(), 1);

        assert!(hook.unregister(id));
        assert!(!hook.unregister(id));
        assert!(hook.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_registration_yields_one_list() {
        let hook = Arc::new(Hook::new());
        let mut tasks = Vec::new();
        for _ in 0..16 {
            let hook = Arc::clone(&hook);
            tasks.push(tokio::spawn(async move {
                hook.register(Block);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hook.len(), 16);
    }
}
