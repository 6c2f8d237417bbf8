//! # Router Module
//!
//! The router collaborator consulted by the dispatch pipeline after hooks and
//! static files.
//!
//! The pipeline only depends on [`RouteDispatch`]: `dispatch` returns
//! `Ok(true)` when a route matched and handled the request, `Ok(false)` when
//! nothing matched, and `Err` when the route handler failed. Upgraded
//! connections go through `dispatch_websocket` instead, which receives the
//! [`WebSocketContext`] rather than a response sink.
//!
//! [`Router`] is the default implementation: an ordered table of `{param}`
//! patterns where the first match wins.
//!
//! ## Example
//!
//! ```rust
//! use switchyard::render::RenderOptions;
//! use switchyard::router::Router;
//! use switchyard::Context;
//!
//! let mut router = Router::new();
//! router.get("/hello/{name}", |ctx| {
//!     let greeting = format!("Hello {}", ctx.param("name").unwrap_or("world"));
//!     ctx.render(RenderOptions::text(greeting))
//! });
//! assert_eq!(router.len(), 1);
//! ```

mod core;

pub use self::core::Router;

use crate::context::{HttpContext, WebSocketContext};
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path parameters stored inline.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Path parameters captured by a route, in pattern order.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Handler for a plain-request route.
pub type RouteHandler = Arc<dyn Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync>;

/// Handler for an upgraded-connection route. Owns the socket until it returns.
pub type WebSocketHandler = Arc<dyn Fn(&mut WebSocketContext) -> anyhow::Result<()> + Send + Sync>;

/// Router collaborator contract.
pub trait RouteDispatch: Send + Sync {
    /// Called once by [`App::warmup`](crate::app::App::warmup).
    fn warmup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Dispatch a plain request. `Ok(true)` iff a route matched and handled it.
    fn dispatch(&self, ctx: &mut HttpContext) -> anyhow::Result<bool>;

    /// Dispatch an upgraded connection. `Ok(true)` iff a route took it.
    fn dispatch_websocket(&self, ctx: &mut WebSocketContext) -> anyhow::Result<bool>;
}
