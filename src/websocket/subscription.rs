use may::sync::mpsc;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{Connection, EventKind, ListenerId, Message, SocketEvent, TransportError};

enum Delivery {
    Item(Message),
    Failed(TransportError),
    Cancelled,
}

/// Why a [`Subscription`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscription's cancellation token fired.
    Cancelled,
    /// The connection emitted an `error` event.
    Transport(TransportError),
}

impl fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionError::Cancelled => f.write_str("subscription cancelled"),
            SubscriptionError::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SubscriptionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubscriptionError::Cancelled => None,
            SubscriptionError::Transport(e) => Some(e),
        }
    }
}

type SharedSender = Arc<Mutex<Option<mpsc::Sender<Delivery>>>>;

fn deliver(tx: &SharedSender, delivery: Delivery) {
    let guard = tx.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(sender) = guard.as_ref() {
        // receiver gone means nobody is iterating any more
        let _ = sender.send(delivery);
    }
}

/// Cancels one [`Subscription`], from any coroutine or listener.
///
/// Messages queued before the cancel are still yielded first.
#[derive(Clone)]
pub struct Canceller {
    token: CancellationToken,
    tx: SharedSender,
}

impl Canceller {
    /// Idempotent; only the first call wakes the subscription.
    pub fn cancel(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        deliver(&self.tx, Delivery::Cancelled);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

/// Pull-based view of a connection's `message` events.
///
/// Yields every message received after creation, in order. Terminates with
/// `Err(Cancelled)` once its [`Canceller`] fires, or with `Err(Transport)` on
/// the first `error` event; after either it only returns `None`. Listeners
/// are detached on termination and on drop.
pub struct Subscription {
    raw: Arc<dyn Connection>,
    rx: mpsc::Receiver<Delivery>,
    tx: SharedSender,
    token: CancellationToken,
    listeners: Vec<ListenerId>,
    done: bool,
}

impl Subscription {
    pub fn new(raw: Arc<dyn Connection>) -> Self {
        let (sender, rx) = mpsc::channel();
        let tx: SharedSender = Arc::new(Mutex::new(Some(sender)));

        let on_message = {
            let tx = Arc::clone(&tx);
            raw.on(
                EventKind::Message,
                Arc::new(move |event| {
                    if let SocketEvent::Message(m) = event {
                        deliver(&tx, Delivery::Item(m.clone()));
                    }
                }),
            )
        };
        let on_error = {
            let tx = Arc::clone(&tx);
            raw.on(
                EventKind::Error,
                Arc::new(move |event| {
                    if let SocketEvent::Error(e) = event {
                        deliver(&tx, Delivery::Failed(e.clone()));
                    }
                }),
            )
        };
        Self {
            raw,
            rx,
            tx,
            token: CancellationToken::new(),
            listeners: vec![on_message, on_error],
            done: false,
        }
    }

    /// Handle that ends this subscription with `Err(Cancelled)`.
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        Canceller {
            token: self.token.clone(),
            tx: Arc::clone(&self.tx),
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        for id in self.listeners.drain(..) {
            self.raw.off(id);
        }
    }
}

impl Iterator for Subscription {
    type Item = Result<Message, SubscriptionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.rx.recv() {
            Ok(Delivery::Item(m)) => Some(Ok(m)),
            Ok(Delivery::Failed(e)) => {
                trace!(error = %e, "Subscription failed");
                self.finish();
                Some(Err(SubscriptionError::Transport(e)))
            }
            Ok(Delivery::Cancelled) => {
                trace!("Subscription cancelled");
                self.finish();
                Some(Err(SubscriptionError::Cancelled))
            }
            Err(_) => {
                self.finish();
                None
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.done {
            self.finish();
        }
    }
}
