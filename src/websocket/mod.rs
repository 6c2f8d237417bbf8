//! # WebSocket Module
//!
//! The duplex stream bridge: turns an event-driven, full-duplex connection
//! into something ordinary sequential code can consume.
//!
//! ## Overview
//!
//! A transport implements [`Connection`]: it pushes [`SocketEvent`]s
//! (`message`, `ping`, `pong`, `close`, `error`) to registered listeners and
//! accepts outbound frames. [`WebSocket`] wraps one connection and offers:
//!
//! - the same five events, passed through unchanged to its own listeners
//! - `send`, `ping`, `pong` and `close` as direct pass-throughs
//! - [`WebSocket::messages`], a single-pass iterator over inbound messages
//!
//! ## Termination
//!
//! The message iterator is built from a [`Subscription`] to `message` events
//! whose [`Canceller`] is fired by the connection's `close` event. The
//! cancelled state is a `tokio_util` `CancellationToken`; no tokio runtime is
//! involved.
//!
//! - `close` (even mid-iteration) ends the iterator with `None`, no error
//! - an `error` event is yielded once as `Some(Err(_))`, then the iterator ends
//! - an `error` followed by `close` is reported once, as the error
//!
//! Each `next()` parks the calling coroutine on a `may` channel until the
//! transport delivers something.
//!
//! ## Example
//!
//! ```rust
//! use switchyard::websocket::{ChannelConnection, WebSocket};
//!
//! let (conn, peer) = ChannelConnection::pair();
//! let socket = WebSocket::new(conn);
//! let messages = socket.messages();
//!
//! peer.message("one");
//! peer.message("two");
//! peer.close(1000, "bye");
//!
//! let received: Vec<_> = messages.map(|m| m.unwrap()).collect();
//! assert_eq!(received.len(), 2);
//! ```

mod bridge;
mod channel;
mod events;
mod subscription;

pub use self::bridge::{Messages, WebSocket};
pub use self::channel::{ChannelConnection, Frame, Peer};
pub use self::events::EventEmitter;
pub use self::subscription::{Canceller, Subscription, SubscriptionError};

use std::fmt;
use std::io;
use std::sync::Arc;

/// Close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;

/// An inbound or outbound data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    /// The text payload, if this is a text frame.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(s) => s.as_bytes(),
            Message::Binary(b) => b,
        }
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Message::Text(s) => s.into_bytes(),
            Message::Binary(b) => b,
        }
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Message::Text(s.to_string())
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Message::Text(s)
    }
}

impl From<Vec<u8>> for Message {
    fn from(b: Vec<u8>) -> Self {
        Message::Binary(b)
    }
}

/// Event kinds a [`Connection`] can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    Ping,
    Pong,
    Close,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Message,
        EventKind::Ping,
        EventKind::Pong,
        EventKind::Close,
        EventKind::Error,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Ping => "ping",
            EventKind::Pong => "pong",
            EventKind::Close => "close",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event emitted by a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Message(Message),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: u16, reason: String },
    Error(TransportError),
}

impl SocketEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            SocketEvent::Message(_) => EventKind::Message,
            SocketEvent::Ping(_) => EventKind::Ping,
            SocketEvent::Pong(_) => EventKind::Pong,
            SocketEvent::Close { .. } => EventKind::Close,
            SocketEvent::Error(_) => EventKind::Error,
        }
    }
}

/// Category of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Operation on a connection that is already closed
    Closed,
    /// Underlying I/O failure
    Io,
    /// Malformed frame or protocol violation
    Protocol,
}

/// Failure reported by a duplex transport.
///
/// Cloneable so one `error` event can reach several listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    kind: TransportErrorKind,
    message: Arc<str>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl AsRef<str>) -> Self {
        Self {
            kind,
            message: Arc::from(message.as_ref()),
        }
    }

    pub fn closed() -> Self {
        Self::new(TransportErrorKind::Closed, "connection is closed")
    }

    pub fn protocol(message: impl AsRef<str>) -> Self {
        Self::new(TransportErrorKind::Protocol, message)
    }

    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TransportErrorKind::Closed => write!(f, "transport closed: {}", self.message),
            TransportErrorKind::Io => write!(f, "transport I/O error: {}", self.message),
            TransportErrorKind::Protocol => write!(f, "protocol error: {}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::new(TransportErrorKind::Io, e.to_string())
    }
}

/// Event listener callback.
pub type Listener = Arc<dyn Fn(&SocketEvent) + Send + Sync>;

/// Handle returned by `on`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// A bidirectional, message-framed connection.
///
/// Implementations must mark themselves closed (`is_closed() == true`) before
/// emitting their `close` event, and emit `close` at most once.
pub trait Connection: Send + Sync {
    /// Send a data frame.
    fn send(&self, message: Message) -> Result<(), TransportError>;

    fn ping(&self, payload: &[u8]) -> Result<(), TransportError>;

    fn pong(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Start the closing handshake.
    fn close(&self, code: u16, reason: &str) -> Result<(), TransportError>;

    /// Register a listener for one event kind.
    fn on(&self, kind: EventKind, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns false if it was not registered.
    fn off(&self, id: ListenerId) -> bool;

    fn is_closed(&self) -> bool;
}
