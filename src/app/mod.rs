//! # App Module
//!
//! The application object and its dispatch pipeline.
//!
//! ## Lifecycle
//!
//! 1. **Setup**: [`App::new`], then [`add_hook`](App::add_hook),
//!    [`register_capability`](App::register_capability),
//!    [`add_helper`](App::add_helper), [`plugin`](App::plugin) and routes.
//! 2. **Warmup**: [`App::warmup`] warms the collaborators and returns an
//!    `Arc<App>`. Nothing can be registered after this point.
//! 3. **Serving**: a transport builds a context with
//!    [`new_http_context`](App::new_http_context) or
//!    [`new_websocket_context`](App::new_websocket_context) and calls
//!    [`handle_request`](App::handle_request).
//!
//! ## Pipeline
//!
//! Plain requests: `request` hook → static files → router → not found.
//! Upgraded connections: `websocket` hook → router (websocket routes); no
//! not-found fallback. The first stage that handles the request ends the
//! pipeline, and any stage error goes to the exception boundary exactly once.
//!
//! ```rust
//! use http::Method;
//! use switchyard::app::{App, Outcome};
//! use switchyard::config::AppConfig;
//! use switchyard::render::RenderOptions;
//! use switchyard::server::Request;
//! use switchyard::Context;
//!
//! let mut app = App::new(AppConfig::default());
//! app.routes().get("/", |ctx| ctx.render(RenderOptions::text("home")));
//! let app = app.warmup().unwrap();
//!
//! let mut ctx = app.new_http_context(Request::new(Method::GET, "/"));
//! assert_eq!(app.handle_request(&mut ctx), Outcome::Route);
//! ```

mod core;

pub use self::core::App;

/// Which stage ended the pipeline for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A hook reported the request handled
    Hook,
    /// The static collaborator served an asset
    Static,
    /// A route matched and handled the request
    Route,
    /// Nothing matched; the not-found response was rendered
    NotFound,
    /// A stage failed; the exception boundary handled it
    Exception,
    /// Upgraded connection with no hook or route taking it
    Unhandled,
    /// The exception boundary itself failed; no response exists
    Faulted,
}

impl Outcome {
    /// True when application code (hook, static or route) produced the response.
    #[must_use]
    pub fn is_handled(self) -> bool {
        matches!(self, Outcome::Hook | Outcome::Static | Outcome::Route)
    }
}
