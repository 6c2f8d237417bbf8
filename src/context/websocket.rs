use crate::app::App;
use crate::render::RenderOptions;
use crate::router::ParamVec;
use crate::server::Request;
use crate::websocket::{Connection, WebSocket};
use std::sync::Arc;

use super::core::{Context, ContextCore, RequestId};

/// Context for an upgraded, full-duplex connection.
///
/// Carries the handshake request and the [`WebSocket`] bridge wrapping the
/// live connection. There is no response body: the connection itself is the
/// response.
pub struct WebSocketContext {
    core: ContextCore,
    req: Request,
    socket: WebSocket,
    params: ParamVec,
}

impl WebSocketContext {
    pub(crate) fn new(app: Arc<App>, handshake: Request, connection: Arc<dyn Connection>) -> Self {
        let request_id = RequestId::from_header_or_new(handshake.header("x-request-id"));
        Self {
            core: ContextCore::new(app, request_id),
            req: handshake,
            socket: WebSocket::new(connection),
            params: ParamVec::new(),
        }
    }

    /// The handshake request.
    #[must_use]
    pub fn req(&self) -> &Request {
        &self.req
    }

    #[must_use]
    pub fn socket(&self) -> &WebSocket {
        &self.socket
    }

    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: ParamVec) {
        self.params = params;
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Context for WebSocketContext {
    fn core(&self) -> &ContextCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ContextCore {
        &mut self.core
    }

    fn as_dyn(&self) -> &dyn Context {
        self
    }

    fn as_dyn_mut(&mut self) -> &mut dyn Context {
        self
    }

    fn is_websocket(&self) -> bool {
        true
    }

    fn path(&self) -> &str {
        &self.req.path
    }

    fn render(&mut self, options: RenderOptions) -> anyhow::Result<()> {
        anyhow::bail!(
            "cannot render {} into an upgraded connection",
            options.describe()
        )
    }

    fn as_websocket(&self) -> Option<&WebSocketContext> {
        Some(self)
    }

    fn as_websocket_mut(&mut self) -> Option<&mut WebSocketContext> {
        Some(self)
    }
}
