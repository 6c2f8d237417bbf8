use super::request::parse_request;
use super::response::{status_reason, write_response};
use crate::app::{App, Outcome};
use crate::context::Context;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::{error, warn};

/// `may_minihttp` service running every request through the app pipeline.
#[derive(Clone)]
pub struct AppService {
    app: Arc<App>,
}

impl AppService {
    #[must_use]
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    #[must_use]
    pub fn app(&self) -> &Arc<App> {
        &self.app
    }
}

fn write_plain(res: &mut Response, status: u16) {
    res.status_code(usize::from(status), status_reason(status));
    res.header("Content-Type: text/plain; charset=utf-8");
    res.body_vec(format!("{}\n", status_reason(status)).into_bytes());
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = match parse_request(req) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed request");
                write_plain(res, 400);
                return Ok(());
            }
        };

        if request.is_upgrade() {
            // this transport cannot hand over the raw socket
            warn!(path = %request.path, "WebSocket upgrade not supported by the HTTP transport");
            write_plain(res, 501);
            return Ok(());
        }

        let mut ctx = self.app.new_http_context(request);
        let outcome = self.app.handle_request(&mut ctx);
        if outcome == Outcome::Faulted {
            error!(
                request_id = %ctx.request_id(),
                "Request faulted, aborting connection"
            );
            return Err(io::Error::other("exception boundary failed to render"));
        }

        let Some(http) = ctx.into_http() else {
            return Err(io::Error::other("plain request lost its response"));
        };
        write_response(res, http.into_response());
        Ok(())
    }
}
