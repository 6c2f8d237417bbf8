use std::sync::Arc;
use tracing::debug;

use super::{
    Connection, EventEmitter, EventKind, ListenerId, Message, SocketEvent, Subscription,
    SubscriptionError, TransportError,
};

/// Bridge over one live [`Connection`].
///
/// Events from the connection are re-emitted unchanged to listeners added
/// with [`on`](WebSocket::on). Outbound calls go straight to the connection.
/// Dropping the bridge detaches it from the connection.
pub struct WebSocket {
    raw: Arc<dyn Connection>,
    events: Arc<EventEmitter>,
    forwarders: Vec<ListenerId>,
}

impl WebSocket {
    pub fn new(raw: Arc<dyn Connection>) -> Self {
        let events = Arc::new(EventEmitter::new());
        let forwarders = EventKind::ALL
            .iter()
            .map(|&kind| {
                let events = Arc::clone(&events);
                raw.on(kind, Arc::new(move |event| events.emit(event)))
            })
            .collect();
        Self {
            raw,
            events,
            forwarders,
        }
    }

    /// The wrapped connection.
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn Connection> {
        &self.raw
    }

    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, Arc::new(listener))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// # Errors
    ///
    /// Whatever the transport reports.
    pub fn send(&self, message: impl Into<Message>) -> Result<(), TransportError> {
        self.raw.send(message.into())
    }

    pub fn ping(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.raw.ping(payload)
    }

    pub fn pong(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.raw.pong(payload)
    }

    pub fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.raw.close(code, reason)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.raw.is_closed()
    }

    /// Inbound messages from now until the connection closes.
    ///
    /// `close` ends the iterator cleanly. A transport error is yielded once as
    /// `Some(Err(_))`, after which the iterator is exhausted.
    #[must_use]
    pub fn messages(&self) -> Messages {
        let subscription = Subscription::new(Arc::clone(&self.raw));
        let canceller = subscription.canceller();
        let close_listener = {
            let canceller = canceller.clone();
            self.raw
                .on(EventKind::Close, Arc::new(move |_| canceller.cancel()))
        };
        // close may have fired before the listener was attached
        if self.raw.is_closed() {
            canceller.cancel();
        }
        Messages {
            raw: Arc::clone(&self.raw),
            subscription,
            close_listener: Some(close_listener),
        }
    }
}

impl Drop for WebSocket {
    fn drop(&mut self) {
        for id in self.forwarders.drain(..) {
            self.raw.off(id);
        }
    }
}

/// Single-pass iterator over a connection's inbound messages.
pub struct Messages {
    raw: Arc<dyn Connection>,
    subscription: Subscription,
    close_listener: Option<ListenerId>,
}

impl Messages {
    fn detach(&mut self) {
        if let Some(id) = self.close_listener.take() {
            self.raw.off(id);
        }
    }
}

impl Iterator for Messages {
    type Item = Result<Message, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.subscription.next() {
            Some(Ok(message)) => Some(Ok(message)),
            Some(Err(SubscriptionError::Cancelled)) => {
                debug!("Connection closed, message stream finished");
                self.detach();
                None
            }
            Some(Err(SubscriptionError::Transport(e))) => {
                debug!(error = %e, "Message stream failed");
                self.detach();
                Some(Err(e))
            }
            None => {
                self.detach();
                None
            }
        }
    }
}

impl Drop for Messages {
    fn drop(&mut self) {
        self.detach();
    }
}
