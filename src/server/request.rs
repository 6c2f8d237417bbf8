use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of headers stored inline.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage; names are lowercase.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Inbound request as seen by the pipeline.
///
/// For upgraded connections this is the handshake request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Headers with lowercase names, in arrival order
    pub headers: HeaderVec,
    pub cookies: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a method and a path that may carry a query string.
    pub fn new(method: Method, target: &str) -> Self {
        let path = target.split('?').next().unwrap_or("/");
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            headers: HeaderVec::new(),
            cookies: HashMap::new(),
            query: parse_query_params(target),
            body: Vec::new(),
        }
    }

    /// Add a header; `cookie` headers also refresh the parsed cookies.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(value));
        }
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First header named `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Body parsed as JSON, if it is valid JSON.
    #[must_use]
    pub fn json(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Whether the client asked to upgrade to a WebSocket.
    #[must_use]
    pub fn is_upgrade(&self) -> bool {
        let connection_upgrade = self
            .header("connection")
            .is_some_and(|v| v.split(',').any(|t| t.trim().eq_ignore_ascii_case("upgrade")));
        let websocket = self
            .header("upgrade")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));
        connection_upgrade && websocket
    }
}

/// Parse a `Cookie` header value.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse the query string of `target` (everything after `?`).
pub fn parse_query_params(target: &str) -> HashMap<String, String> {
    match target.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Convert a `may_minihttp` request into a [`Request`].
///
/// # Errors
///
/// Unknown methods and unreadable bodies.
pub fn parse_request(req: may_minihttp::Request) -> anyhow::Result<Request> {
    let method = Method::from_bytes(req.method().as_bytes())?;
    let mut request = Request::new(method, req.path());

    for h in req.headers() {
        let value = String::from_utf8_lossy(h.value);
        request = request.with_header(h.name, &value);
    }

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;
    request.body = body;

    debug!(
        method = %request.method,
        path = %request.path,
        headers_count = request.headers.len(),
        cookie_count = request.cookies.len(),
        query_count = request.query.len(),
        body_size_bytes = request.body.len(),
        "HTTP request parsed"
    );
    Ok(request)
}
