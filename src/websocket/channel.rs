use may::sync::mpsc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::trace;

use super::{
    Connection, EventEmitter, EventKind, Listener, ListenerId, Message, SocketEvent,
    TransportError,
};

/// Outbound frame observed by the [`Peer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Message(Message),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: u16, reason: String },
}

/// In-process duplex connection backed by `may` channels.
///
/// Created in pairs with [`ChannelConnection::pair`]: the connection side is
/// handed to the app, the [`Peer`] side plays the remote endpoint by
/// injecting events and reading outbound frames.
pub struct ChannelConnection {
    events: EventEmitter,
    closed: AtomicBool,
    outbound: Mutex<mpsc::Sender<Frame>>,
}

impl ChannelConnection {
    #[must_use]
    pub fn pair() -> (Arc<ChannelConnection>, Peer) {
        let (tx, rx) = mpsc::channel();
        let conn = Arc::new(ChannelConnection {
            events: EventEmitter::new(),
            closed: AtomicBool::new(false),
            outbound: Mutex::new(tx),
        });
        let peer = Peer {
            conn: Arc::clone(&conn),
            frames: rx,
        };
        (conn, peer)
    }

    /// Listeners currently attached for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.events.listener_count(kind)
    }

    fn push(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::closed());
        }
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(frame)
            .map_err(|_| TransportError::protocol("peer went away"))
    }

    /// Mark closed and emit `close`, once.
    fn shutdown(&self, code: u16, reason: &str) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        trace!(code, reason, "Channel connection closed");
        self.events.emit(&SocketEvent::Close {
            code,
            reason: reason.to_string(),
        });
        true
    }
}

impl Connection for ChannelConnection {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        self.push(Frame::Message(message))
    }

    fn ping(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.push(Frame::Ping(payload.to_vec()))
    }

    fn pong(&self, payload: &[u8]) -> Result<(), TransportError> {
        self.push(Frame::Pong(payload.to_vec()))
    }

    fn close(&self, code: u16, reason: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Ok(());
        }
        let frame = Frame::Close {
            code,
            reason: reason.to_string(),
        };
        // peer may already be gone; closing locally still succeeds
        let _ = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(frame);
        self.shutdown(code, reason);
        Ok(())
    }

    fn on(&self, kind: EventKind, listener: Listener) -> ListenerId {
        self.events.on(kind, listener)
    }

    fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Remote end of a [`ChannelConnection`].
pub struct Peer {
    conn: Arc<ChannelConnection>,
    frames: mpsc::Receiver<Frame>,
}

impl Peer {
    /// Deliver an inbound message. Ignored once the connection is closed.
    pub fn message(&self, message: impl Into<Message>) {
        self.emit_open(SocketEvent::Message(message.into()));
    }

    pub fn ping(&self, payload: &[u8]) {
        self.emit_open(SocketEvent::Ping(payload.to_vec()));
    }

    pub fn pong(&self, payload: &[u8]) {
        self.emit_open(SocketEvent::Pong(payload.to_vec()));
    }

    /// Close from the remote side. Returns false if already closed.
    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.conn.shutdown(code, reason)
    }

    /// Report a transport failure.
    pub fn error(&self, error: TransportError) {
        self.conn.events.emit(&SocketEvent::Error(error));
    }

    /// Next outbound frame, parking until one is available.
    pub fn recv(&self) -> Option<Frame> {
        self.frames.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Frame> {
        self.frames.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<Frame> {
        self.frames.try_recv().ok()
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<ChannelConnection> {
        &self.conn
    }

    fn emit_open(&self, event: SocketEvent) {
        if self.conn.is_closed() {
            return;
        }
        self.conn.events.emit(&event);
    }
}
