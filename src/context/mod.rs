//! # Context Module
//!
//! Per-request context objects. A context is created by the [`App`] for every
//! inbound connection, exclusively owned by the coroutine serving it, and
//! dropped when the pipeline (or, for streams, the application handler)
//! returns.
//!
//! There are two variants, fixed at construction:
//!
//! - [`HttpContext`]: plain request with an outbound [`Response`](crate::server::Response)
//! - [`WebSocketContext`]: upgraded connection wrapped in a [`WebSocket`](crate::websocket::WebSocket) bridge
//!
//! [`RequestContext`] holds either one and is what the dispatch pipeline
//! receives. Both variants carry a stash (`serde_json` map) for per-request
//! data, a back-reference to the owning app and the same capability surface
//! (see [`capability`](crate::capability)).
//!
//! [`App`]: crate::app::App

mod core;
mod http;
mod websocket;

pub use self::core::{Context, ContextCore, RequestId};
pub use self::http::HttpContext;
pub use self::websocket::WebSocketContext;

use crate::render::RenderOptions;

/// A classified inbound connection.
pub enum RequestContext {
    Http(HttpContext),
    WebSocket(WebSocketContext),
}

impl RequestContext {
    /// Unwrap the plain-request variant.
    #[must_use]
    pub fn into_http(self) -> Option<HttpContext> {
        match self {
            RequestContext::Http(ctx) => Some(ctx),
            RequestContext::WebSocket(_) => None,
        }
    }

    #[must_use]
    pub fn into_websocket(self) -> Option<WebSocketContext> {
        match self {
            RequestContext::WebSocket(ctx) => Some(ctx),
            RequestContext::Http(_) => None,
        }
    }

    fn inner(&self) -> &dyn Context {
        match self {
            RequestContext::Http(ctx) => ctx,
            RequestContext::WebSocket(ctx) => ctx,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Context {
        match self {
            RequestContext::Http(ctx) => ctx,
            RequestContext::WebSocket(ctx) => ctx,
        }
    }
}

impl Context for RequestContext {
    fn core(&self) -> &ContextCore {
        self.inner().core()
    }

    fn core_mut(&mut self) -> &mut ContextCore {
        self.inner_mut().core_mut()
    }

    fn as_dyn(&self) -> &dyn Context {
        self.inner()
    }

    fn as_dyn_mut(&mut self) -> &mut dyn Context {
        self.inner_mut()
    }

    fn is_websocket(&self) -> bool {
        matches!(self, RequestContext::WebSocket(_))
    }

    fn path(&self) -> &str {
        self.inner().path()
    }

    fn render(&mut self, options: RenderOptions) -> anyhow::Result<()> {
        self.inner_mut().render(options)
    }

    fn as_http(&self) -> Option<&HttpContext> {
        match self {
            RequestContext::Http(ctx) => Some(ctx),
            RequestContext::WebSocket(_) => None,
        }
    }

    fn as_http_mut(&mut self) -> Option<&mut HttpContext> {
        match self {
            RequestContext::Http(ctx) => Some(ctx),
            RequestContext::WebSocket(_) => None,
        }
    }

    fn as_websocket(&self) -> Option<&WebSocketContext> {
        match self {
            RequestContext::WebSocket(ctx) => Some(ctx),
            RequestContext::Http(_) => None,
        }
    }

    fn as_websocket_mut(&mut self) -> Option<&mut WebSocketContext> {
        match self {
            RequestContext::WebSocket(ctx) => Some(ctx),
            RequestContext::Http(_) => None,
        }
    }
}
