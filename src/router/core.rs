use crate::context::{HttpContext, WebSocketContext};
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ParamVec, RouteDispatch, RouteHandler, WebSocketHandler};

/// One segment of a compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(Arc<str>),
    Param(Arc<str>),
}

#[derive(Clone)]
enum Endpoint {
    /// `None` matches every method
    Http(Option<Method>, RouteHandler),
    WebSocket(WebSocketHandler),
}

#[derive(Clone)]
struct Route {
    pattern: String,
    segments: SmallVec<[Segment; 8]>,
    endpoint: Endpoint,
}

impl Route {
    fn new(pattern: &str, endpoint: Endpoint) -> Self {
        let segments = split_path(pattern)
            .map(|seg| match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(Arc::from(name)),
                None => Segment::Static(Arc::from(seg)),
            })
            .collect();
        Self {
            pattern: pattern.to_string(),
            segments,
            endpoint,
        }
    }

    /// Match `path` segment by segment, collecting parameters.
    fn matches(&self, path: &str) -> Option<ParamVec> {
        let mut params = ParamVec::new();
        let mut parts = split_path(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Static(s) if s.as_ref() == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => params.push((Arc::clone(name), part.to_string())),
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }

    fn kind(&self) -> &'static str {
        match self.endpoint {
            Endpoint::Http(..) => "http",
            Endpoint::WebSocket(_) => "websocket",
        }
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
}

/// Ordered route table.
///
/// Patterns are `/`-separated segments where `{name}` captures one segment.
/// Routes are tried in registration order and the first match wins. Plain
/// requests only see HTTP routes, upgraded connections only see
/// [`websocket`](Router::websocket) routes.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, pattern: &str, endpoint: Endpoint) -> &mut Self {
        let route = Route::new(pattern, endpoint);
        debug!(pattern = %pattern, kind = route.kind(), "Route added");
        self.routes.push(route);
        self
    }

    fn http<F>(&mut self, method: Option<Method>, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(pattern, Endpoint::Http(method, Arc::new(handler)))
    }

    /// Route matching every request method.
    pub fn any<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.http(None, pattern, handler)
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.http(Some(Method::GET), pattern, handler)
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.http(Some(Method::POST), pattern, handler)
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.http(Some(Method::PUT), pattern, handler)
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.http(Some(Method::PATCH), pattern, handler)
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.http(Some(Method::DELETE), pattern, handler)
    }

    pub fn options<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut HttpContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.http(Some(Method::OPTIONS), pattern, handler)
    }

    /// Route for upgraded connections.
    pub fn websocket<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut WebSocketContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add(pattern, Endpoint::WebSocket(Arc::new(handler)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first HTTP route for `method` and `path`.
    fn find_http(&self, method: &Method, path: &str) -> Option<(&Route, RouteHandler, ParamVec)> {
        self.routes.iter().find_map(|route| match &route.endpoint {
            Endpoint::Http(m, handler) if m.as_ref().map_or(true, |m| m == method) => route
                .matches(path)
                .map(|params| (route, Arc::clone(handler), params)),
            _ => None,
        })
    }

    fn find_websocket(&self, path: &str) -> Option<(&Route, WebSocketHandler, ParamVec)> {
        self.routes.iter().find_map(|route| match &route.endpoint {
            Endpoint::WebSocket(handler) => route
                .matches(path)
                .map(|params| (route, Arc::clone(handler), params)),
            Endpoint::Http(..) => None,
        })
    }

    /// Registered patterns with their kind, in match order.
    pub fn patterns(&self) -> impl Iterator<Item = (&str, &'static str)> + '_ {
        self.routes.iter().map(|r| (r.pattern.as_str(), r.kind()))
    }
}

impl RouteDispatch for Router {
    fn warmup(&mut self) -> anyhow::Result<()> {
        info!(routes_count = self.routes.len(), "Routing table loaded");
        Ok(())
    }

    fn dispatch(&self, ctx: &mut HttpContext) -> anyhow::Result<bool> {
        let method = ctx.req().method.clone();
        let Some((route, handler, params)) = self.find_http(&method, &ctx.req().path) else {
            debug!(method = %method, path = %ctx.req().path, "No route matched");
            return Ok(false);
        };
        debug!(
            method = %method,
            path = %ctx.req().path,
            route_pattern = %route.pattern,
            path_params = ?params,
            "Route matched"
        );
        ctx.set_params(params);
        handler(ctx)?;
        Ok(true)
    }

    fn dispatch_websocket(&self, ctx: &mut WebSocketContext) -> anyhow::Result<bool> {
        let Some((route, handler, params)) = self.find_websocket(&ctx.req().path) else {
            debug!(path = %ctx.req().path, "No websocket route matched");
            return Ok(false);
        };
        debug!(
            path = %ctx.req().path,
            route_pattern = %route.pattern,
            path_params = ?params,
            "WebSocket route matched"
        );
        ctx.set_params(params);
        handler(ctx)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut HttpContext) -> anyhow::Result<()> {
        Ok(())
    }

    #[test]
    fn test_static_and_param_segments() {
        let route = Route::new("/users/{id}/posts/{post}", Endpoint::Http(None, Arc::new(noop)));
        let params = route.matches("/users/42/posts/7").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].0.as_ref(), "id");
        assert_eq!(params[0].1, "42");
        assert_eq!(params[1].1, "7");
        assert!(route.matches("/users/42/posts").is_none());
        assert!(route.matches("/users/42/posts/7/extra").is_none());
        assert!(route.matches("/people/42/posts/7").is_none());
    }

    #[test]
    fn test_trailing_slash_and_query_are_ignored() {
        let route = Route::new("/health", Endpoint::Http(None, Arc::new(noop)));
        assert!(route.matches("/health/").is_some());
        assert!(route.matches("/health?verbose=1").is_some());
    }

    #[test]
    fn test_root_pattern() {
        let route = Route::new("/", Endpoint::Http(None, Arc::new(noop)));
        assert!(route.matches("/").is_some());
        assert!(route.matches("/x").is_none());
    }

    #[test]
    fn test_first_match_wins_and_method_filter() {
        let mut router = Router::new();
        router
            .post("/items/{id}", noop)
            .get("/items/new", noop)
            .get("/items/{id}", noop);

        let (route, _, _) = router.find_http(&Method::GET, "/items/new").unwrap();
        assert_eq!(route.pattern, "/items/new");
        let (route, _, params) = router.find_http(&Method::GET, "/items/5").unwrap();
        assert_eq!(route.pattern, "/items/{id}");
        assert_eq!(params[0].1, "5");
        let (route, _, _) = router.find_http(&Method::POST, "/items/new").unwrap();
        assert_eq!(route.pattern, "/items/{id}");
        assert!(router.find_http(&Method::DELETE, "/items/5").is_none());
    }

    #[test]
    fn test_websocket_routes_are_separate() {
        let mut router = Router::new();
        router.any("/chat", noop).websocket("/chat", |_| Ok(()));
        assert!(router.find_websocket("/chat").is_some());
        assert!(router.find_websocket("/other").is_none());
        let (route, _, _) = router.find_http(&Method::GET, "/chat").unwrap();
        assert_eq!(route.kind(), "http");
        assert_eq!(router.len(), 2);
        assert_eq!(
            router.patterns().collect::<Vec<_>>(),
            vec![("/chat", "http"), ("/chat", "websocket")]
        );
    }
}
