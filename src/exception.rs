//! # Exception Boundary
//!
//! Converts a failed or unmatched request into a rendered response.
//!
//! [`report_exception`] renders status 500 and [`report_not_found`] renders
//! status 404. In development mode both use the verbose `debug` view; in
//! production the generic `exception` and `not_found` views are used. The
//! view format comes from [`AppConfig::exception_format`](crate::config::AppConfig).
//!
//! Neither function returns an error. If rendering fails inside the boundary
//! the request is marked faulted ([`ContextCore::is_faulted`]) and the
//! transport aborts the connection; there is no second fallback.
//!
//! Upgraded connections have no response body, so an exception on a
//! [`WebSocketContext`](crate::context::WebSocketContext) closes the socket
//! with code 1011 (internal error) instead of rendering.
//!
//! [`ContextCore::is_faulted`]: crate::context::ContextCore::is_faulted

use crate::context::Context;
use crate::render::RenderOptions;
use serde_json::json;
use tracing::{error, warn};

/// Verbose diagnostic view used in development mode.
pub const DEBUG_VIEW: &str = "debug";
/// Generic internal error view.
pub const EXCEPTION_VIEW: &str = "exception";
/// Generic not-found view.
pub const NOT_FOUND_VIEW: &str = "not_found";

/// Close code sent to an upgraded connection whose handling failed.
pub const WEBSOCKET_INTERNAL_ERROR: u16 = 1011;

/// Log `err`, stash it on the context and render an internal-error response.
pub fn report_exception(ctx: &mut dyn Context, err: anyhow::Error) {
    error!(
        request_id = %ctx.request_id(),
        path = %ctx.path(),
        error = ?err,
        "Request failed"
    );

    let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
    ctx.stash_mut().insert(
        "exception".to_string(),
        json!({
            "message": err.to_string(),
            "causes": causes,
            "detail": format!("{err:?}"),
        }),
    );
    ctx.core_mut().set_error(err);

    if let Some(ws) = ctx.as_websocket() {
        if let Err(e) = ws
            .socket()
            .close(WEBSOCKET_INTERNAL_ERROR, "Internal Server Error")
        {
            warn!(request_id = %ctx.request_id(), error = %e, "Failed to close upgraded connection");
        }
        return;
    }

    let view = if ctx.app().mode().is_development() {
        DEBUG_VIEW
    } else {
        EXCEPTION_VIEW
    };
    render_or_fault(ctx, view, 500);
}

/// Render the not-found response.
pub fn report_not_found(ctx: &mut dyn Context) {
    if ctx.is_websocket() {
        // nothing to render into
        return;
    }
    let view = if ctx.app().mode().is_development() {
        DEBUG_VIEW
    } else {
        NOT_FOUND_VIEW
    };
    render_or_fault(ctx, view, 404);
}

fn render_or_fault(ctx: &mut dyn Context, view: &str, status: u16) {
    let format = ctx.app().config().exception_format.extension();
    let options = RenderOptions::view(view).status(status).format(format);
    if let Err(e) = ctx.render(options) {
        error!(
            request_id = %ctx.request_id(),
            view = %view,
            status,
            error = ?e,
            "Exception boundary failed to render"
        );
        ctx.core_mut().mark_faulted();
    }
}
