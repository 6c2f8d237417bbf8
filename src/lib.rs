//! # switchyard
//!
//! **switchyard** is the request-serving core of a web application runtime,
//! built on the `may` coroutine runtime and `may_minihttp`.
//!
//! ## Overview
//!
//! Every inbound connection, plain request or upgraded stream, goes through
//! one fixed, short-circuiting pipeline and produces exactly one terminal
//! outcome: a response rendered by a hook, a static asset, a route, the
//! not-found fallback or the exception boundary.
//!
//! ## Architecture
//!
//! - **[`app`]** - The [`App`] object, setup/warmup lifecycle and the dispatch pipeline
//! - **[`hooks`]** - Named, ordered hook lists (`request`, `websocket`)
//! - **[`capability`]** - Capability table shared by both context variants
//! - **[`context`]** - Per-request contexts ([`HttpContext`], [`WebSocketContext`])
//! - **[`exception`]** - Exception boundary: internal-error and not-found responses
//! - **[`websocket`]** - Duplex stream bridge: event pass-through and a cancellable message iterator
//! - **[`router`]** - Router collaborator (ordered `{param}` routes)
//! - **[`static_files`]** - Static asset collaborator
//! - **[`render`]** - Rendering collaborator (`minijinja` views)
//! - **[`server`]** - HTTP transport on `may_minihttp`
//! - **[`config`]** / **[`logging`]** - Configuration and `tracing` setup
//!
//! ### Pipeline
//!
//! ```mermaid
//! flowchart TD
//!     C{upgrade?} -->|no| R[request hook]
//!     R -->|handled| Done
//!     R --> S[static files]
//!     S -->|served| Done
//!     S --> T[router]
//!     T -->|matched| Done
//!     T --> N[not found]
//!     C -->|yes| W[websocket hook]
//!     W -->|handled| Done
//!     W --> WT[router: websocket routes]
//!     WT --> Done
//!     R & S & T & W & WT -.error.-> E[exception boundary]
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use switchyard::{App, AppConfig, Context, Outcome, RenderOptions, Request};
//!
//! let mut app = App::new(AppConfig::default());
//! app.add_helper("greeting", |_ctx, _args| Ok(json!("hello"))).unwrap();
//! app.routes().get("/", |ctx| {
//!     let greeting = ctx.call("greeting", &[])?;
//!     ctx.render(RenderOptions::json(json!({ "message": greeting })))
//! });
//! let app = app.warmup().unwrap();
//!
//! let mut ctx = app.new_http_context(Request::new(Method::GET, "/"));
//! assert_eq!(app.handle_request(&mut ctx), Outcome::Route);
//! let res = ctx.into_http().unwrap().into_response();
//! assert_eq!(res.status, 200);
//! ```
//!
//! ## Streams
//!
//! Upgraded connections are served by websocket routes, which consume the
//! socket's message iterator until the peer closes:
//!
//! ```rust
//! use http::Method;
//! use switchyard::websocket::ChannelConnection;
//! use switchyard::{App, AppConfig, Outcome, Request};
//!
//! let mut app = App::new(AppConfig::default());
//! app.routes().websocket("/echo", |ctx| {
//!     for message in ctx.socket().messages() {
//!         ctx.socket().send(message?)?;
//!     }
//!     Ok(())
//! });
//! let app = app.warmup().unwrap();
//!
//! let (conn, peer) = ChannelConnection::pair();
//! peer.close(1000, "done");
//! let mut ctx = app.new_websocket_context(Request::new(Method::GET, "/echo"), conn);
//! assert_eq!(app.handle_request(&mut ctx), Outcome::Route);
//! ```

pub mod app;
pub mod capability;
pub mod cli;
pub mod config;
pub mod context;
pub mod exception;
pub mod hooks;
pub mod logging;
pub mod render;
pub mod router;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use app::{App, Outcome};
pub use capability::{Capability, CapabilityError, ConfigurationError};
pub use config::{AppConfig, Mode};
pub use context::{Context, HttpContext, RequestContext, WebSocketContext};
pub use render::RenderOptions;
pub use server::{Request, Response};
