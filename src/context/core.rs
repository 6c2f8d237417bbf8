use crate::app::App;
use crate::capability::CapabilityError;
use crate::exception;
use crate::render::RenderOptions;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use super::{HttpContext, WebSocketContext};

/// Per-request identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse a client-supplied `x-request-id` when it is a valid ULID.
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_else(RequestId::new)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| serde::de::Error::custom("invalid request id"))
    }
}

/// State shared by both context variants.
pub struct ContextCore {
    app: Arc<App>,
    request_id: RequestId,
    stash: Map<String, Value>,
    error: Option<anyhow::Error>,
    faulted: bool,
}

impl ContextCore {
    pub(crate) fn new(app: Arc<App>, request_id: RequestId) -> Self {
        Self {
            app,
            request_id,
            stash: Map::new(),
            error: None,
            faulted: false,
        }
    }

    #[must_use]
    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn stash(&self) -> &Map<String, Value> {
        &self.stash
    }

    pub fn stash_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.stash
    }

    /// Error captured by the exception boundary, if any.
    #[must_use]
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub(crate) fn set_error(&mut self, error: anyhow::Error) {
        self.error = Some(error);
    }

    /// True when the exception boundary itself failed to produce a response.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub(crate) fn mark_faulted(&mut self) {
        self.faulted = true;
    }
}

/// Behaviour shared by every per-request context.
///
/// Implemented by [`HttpContext`], [`WebSocketContext`] and the
/// [`RequestContext`](super::RequestContext) wrapper. Capabilities registered
/// on the app are reached through [`call`](Context::call),
/// [`get`](Context::get) and [`set`](Context::set) on any of them.
pub trait Context: Send {
    fn core(&self) -> &ContextCore;
    fn core_mut(&mut self) -> &mut ContextCore;
    fn as_dyn(&self) -> &dyn Context;
    fn as_dyn_mut(&mut self) -> &mut dyn Context;

    /// Whether this context wraps an upgraded connection.
    fn is_websocket(&self) -> bool;

    /// Request path (the handshake path for upgraded connections).
    fn path(&self) -> &str;

    /// Render a response through the app's renderer.
    fn render(&mut self, options: RenderOptions) -> anyhow::Result<()>;

    fn as_http(&self) -> Option<&HttpContext> {
        None
    }

    fn as_http_mut(&mut self) -> Option<&mut HttpContext> {
        None
    }

    fn as_websocket(&self) -> Option<&WebSocketContext> {
        None
    }

    fn as_websocket_mut(&mut self) -> Option<&mut WebSocketContext> {
        None
    }

    fn app(&self) -> &Arc<App> {
        self.core().app()
    }

    fn request_id(&self) -> RequestId {
        self.core().request_id()
    }

    fn stash(&self) -> &Map<String, Value> {
        self.core().stash()
    }

    fn stash_mut(&mut self) -> &mut Map<String, Value> {
        self.core_mut().stash_mut()
    }

    /// Invoke a method capability.
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, CapabilityError> {
        let method = self.app().capabilities().method(name)?;
        method(self.as_dyn_mut(), args).map_err(|source| CapabilityError::Failed {
            name: name.to_string(),
            source,
        })
    }

    /// Read an accessor capability.
    fn get(&self, name: &str) -> Result<Value, CapabilityError> {
        let getter = self.app().capabilities().getter(name)?;
        getter(self.as_dyn()).map_err(|source| CapabilityError::Failed {
            name: name.to_string(),
            source,
        })
    }

    /// Write an accessor capability.
    fn set(&mut self, name: &str, value: Value) -> Result<(), CapabilityError> {
        let setter = self.app().capabilities().setter(name)?;
        setter(self.as_dyn_mut(), value).map_err(|source| CapabilityError::Failed {
            name: name.to_string(),
            source,
        })
    }

    /// Hand `error` to the exception boundary.
    fn exception(&mut self, error: anyhow::Error) {
        exception::report_exception(self.as_dyn_mut(), error);
    }

    /// Render the not-found fallback.
    fn not_found(&mut self) {
        exception::report_not_found(self.as_dyn_mut());
    }
}
