//! # Server Module
//!
//! HTTP transport built on `may_minihttp`. [`AppService`] parses each request
//! into a [`Request`], runs it through [`App::handle_request`] and writes the
//! resulting [`Response`]. [`HttpServer`] binds an address and records itself
//! on the app so [`App::server`] can report it while it runs.
//!
//! Upgrade requests are answered `501 Not Implemented` before the pipeline
//! runs, because `may_minihttp` cannot hand over the raw socket. The
//! `websocket` hook and websocket routes are therefore reachable only through
//! [`App::new_websocket_context`] with a [`Connection`] supplied by another
//! transport (or [`ChannelConnection`] in tests).
//!
//! [`App::new_websocket_context`]: crate::app::App::new_websocket_context
//! [`Connection`]: crate::websocket::Connection
//! [`ChannelConnection`]: crate::websocket::ChannelConnection
//! [`App::handle_request`]: crate::app::App::handle_request
//! [`App::server`]: crate::app::App::server

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle, ServerInfo};
pub use request::{parse_cookies, parse_query_params, parse_request, HeaderVec, Request};
pub use response::{status_reason, write_response, Response};
pub use service::AppService;
