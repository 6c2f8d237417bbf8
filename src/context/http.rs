use crate::app::App;
use crate::render::RenderOptions;
use crate::router::ParamVec;
use crate::server::{Request, Response};
use std::sync::Arc;

use super::core::{Context, ContextCore, RequestId};

/// Context for a plain request/response exchange.
pub struct HttpContext {
    core: ContextCore,
    req: Request,
    res: Response,
    params: ParamVec,
}

impl HttpContext {
    pub(crate) fn new(app: Arc<App>, req: Request) -> Self {
        let request_id = RequestId::from_header_or_new(req.header("x-request-id"));
        Self {
            core: ContextCore::new(app, request_id),
            req,
            res: Response::default(),
            params: ParamVec::new(),
        }
    }

    #[must_use]
    pub fn req(&self) -> &Request {
        &self.req
    }

    #[must_use]
    pub fn res(&self) -> &Response {
        &self.res
    }

    pub fn res_mut(&mut self) -> &mut Response {
        &mut self.res
    }

    /// Consume the context, keeping only the response.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.res
    }

    /// Path parameters captured by the router.
    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: ParamVec) {
        self.params = params;
    }

    /// Get a path parameter by name (last occurrence wins).
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Context for HttpContext {
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
        false
    }

    fn path(&self) -> &str {
        &self.req.path
    }

    fn render(&mut self, options: RenderOptions) -> anyhow::Result<()> {
        let app = Arc::clone(self.app());
        let rendered = app.renderer().render(&*self, &options)?;
        self.res.status = options.status.unwrap_or(200);
        self.res.content_type = Some(rendered.content_type);
        self.res.body = rendered.body;
        self.res.rendered = true;
        Ok(())
    }

    fn as_http(&self) -> Option<&HttpContext> {
        Some(self)
    }

    fn as_http_mut(&mut self) -> Option<&mut HttpContext> {
        Some(self)
    }
}
