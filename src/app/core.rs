use crate::capability::{Capability, CapabilityTable, ConfigurationError};
use crate::config::{AppConfig, Mode};
use crate::context::{Context, HttpContext, RequestContext, WebSocketContext};
use crate::hooks::{self, Hooks};
use crate::render::{Renderer, TemplateRenderer};
use crate::router::{RouteDispatch, Router};
use crate::server::{Request, ServerInfo};
use crate::static_files::{StaticDispatch, StaticFiles};
use crate::websocket::Connection;
use arc_swap::ArcSwapOption;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::Outcome;

/// The application: configuration, hooks, capabilities and collaborators.
///
/// Built and mutated during setup, then frozen by [`App::warmup`] into an
/// `Arc<App>` shared by every request.
pub struct App {
    config: AppConfig,
    hooks: Hooks,
    capabilities: CapabilityTable,
    routes: Router,
    custom_router: Option<Box<dyn RouteDispatch>>,
    static_files: Box<dyn StaticDispatch>,
    renderer: Box<dyn Renderer>,
    server: ArcSwapOption<ServerInfo>,
}

impl App {
    /// New app with the default collaborators: an empty [`Router`],
    /// [`StaticFiles`] on `config.static_dir` and a [`TemplateRenderer`].
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let static_files =
            StaticFiles::new(config.static_dir.clone()).with_prefix(&config.static_prefix);
        let mut renderer = TemplateRenderer::new();
        if let Some(dir) = &config.template_dir {
            renderer = renderer.with_dir(dir);
        }
        Self {
            config,
            hooks: Hooks::new(),
            capabilities: CapabilityTable::new(),
            routes: Router::new(),
            custom_router: None,
            static_files: Box::new(static_files),
            renderer: Box::new(renderer),
            server: ArcSwapOption::empty(),
        }
    }

    /// Append a handler to hook `name`.
    pub fn add_hook<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.hooks.add_hook(name, handler);
        self
    }

    /// Add a capability to both context variants.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] if the name is taken. Startup should abort.
    pub fn register_capability(
        &mut self,
        name: &str,
        capability: Capability,
    ) -> Result<&mut Self, ConfigurationError> {
        self.capabilities.register(name, capability)?;
        Ok(self)
    }

    /// Register a method capability.
    ///
    /// # Errors
    ///
    /// Same as [`register_capability`](App::register_capability).
    pub fn add_helper<F>(&mut self, name: &str, helper: F) -> Result<&mut Self, ConfigurationError>
    where
        F: Fn(&mut dyn Context, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register_capability(name, Capability::method(helper))
    }

    /// Apply a plugin: any setup function over the app.
    ///
    /// # Errors
    ///
    /// Whatever the plugin returns.
    pub fn plugin<P>(&mut self, plugin: P) -> anyhow::Result<&mut Self>
    where
        P: FnOnce(&mut App) -> anyhow::Result<()>,
    {
        plugin(self)?;
        Ok(self)
    }

    /// The built-in route table. Ignored once a custom router is set.
    pub fn routes(&mut self) -> &mut Router {
        &mut self.routes
    }

    pub fn set_router<R: RouteDispatch + 'static>(&mut self, router: R) -> &mut Self {
        self.custom_router = Some(Box::new(router));
        self
    }

    pub fn set_static<S: StaticDispatch + 'static>(&mut self, static_files: S) -> &mut Self {
        self.static_files = Box::new(static_files);
        self
    }

    pub fn set_renderer<R: Renderer + 'static>(&mut self, renderer: R) -> &mut Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Finish setup and freeze the app.
    ///
    /// # Errors
    ///
    /// Any collaborator failing its own warmup.
    pub fn warmup(mut self) -> anyhow::Result<Arc<App>> {
        self.renderer.warmup()?;
        self.static_files.warmup()?;
        match self.custom_router.as_mut() {
            Some(router) => router.warmup()?,
            None => self.routes.warmup()?,
        }

        let capabilities: Vec<String> = self
            .capabilities
            .descriptors()
            .map(|(name, kind)| format!("{name}:{kind:?}"))
            .collect();
        info!(
            mode = %self.config.mode,
            request_hooks = self.hooks.len(hooks::REQUEST),
            websocket_hooks = self.hooks.len(hooks::WEBSOCKET),
            capabilities = ?capabilities,
            "App warmed up"
        );
        Ok(Arc::new(self))
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    #[must_use]
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    #[must_use]
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    #[must_use]
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    fn router(&self) -> &dyn RouteDispatch {
        match &self.custom_router {
            Some(router) => router.as_ref(),
            None => &self.routes,
        }
    }

    /// The running server, if one is attached and still alive.
    #[must_use]
    pub fn server(&self) -> Option<Arc<ServerInfo>> {
        self.server.load_full().filter(|info| info.is_alive())
    }

    pub(crate) fn attach_server(&self, info: Arc<ServerInfo>) {
        self.server.store(Some(info));
    }

    /// Context for a plain request.
    pub fn new_http_context(self: &Arc<Self>, req: Request) -> RequestContext {
        RequestContext::Http(HttpContext::new(Arc::clone(self), req))
    }

    /// Context for an upgraded connection.
    pub fn new_websocket_context(
        self: &Arc<Self>,
        handshake: Request,
        connection: Arc<dyn Connection>,
    ) -> RequestContext {
        RequestContext::WebSocket(WebSocketContext::new(Arc::clone(self), handshake, connection))
    }

    /// Run the dispatch pipeline for one connection.
    ///
    /// Every stage error is caught here, once, and handed to the exception
    /// boundary. The returned [`Outcome`] names the single stage that
    /// produced the response.
    pub fn handle_request(&self, ctx: &mut RequestContext) -> Outcome {
        let result = match ctx {
            RequestContext::Http(http) => self.dispatch_http(http),
            RequestContext::WebSocket(ws) => self.dispatch_websocket(ws),
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                ctx.exception(e);
                Outcome::Exception
            }
        };

        if ctx.core().is_faulted() {
            return Outcome::Faulted;
        }
        debug!(
            request_id = %ctx.request_id(),
            path = %ctx.path(),
            outcome = ?outcome,
            "Request dispatched"
        );
        outcome
    }

    fn dispatch_http(&self, ctx: &mut HttpContext) -> anyhow::Result<Outcome> {
        if self.hooks.run_hook(hooks::REQUEST, ctx)? {
            return Ok(Outcome::Hook);
        }
        if self.static_files.dispatch(ctx)? {
            debug!(request_id = %ctx.request_id(), stage = "static", "Request served");
            return Ok(Outcome::Static);
        }
        if self.router().dispatch(ctx)? {
            debug!(request_id = %ctx.request_id(), stage = "router", "Request served");
            return Ok(Outcome::Route);
        }
        ctx.not_found();
        Ok(Outcome::NotFound)
    }

    fn dispatch_websocket(&self, ctx: &mut WebSocketContext) -> anyhow::Result<Outcome> {
        if self.hooks.run_hook(hooks::WEBSOCKET, ctx)? {
            return Ok(Outcome::Hook);
        }
        if self.router().dispatch_websocket(ctx)? {
            return Ok(Outcome::Route);
        }
        debug!(
            request_id = %ctx.request_id(),
            path = %ctx.path(),
            "No handler for upgraded connection"
        );
        Ok(Outcome::Unhandled)
    }
}
