use super::request::HeaderVec;
use std::sync::Arc;

/// Outbound response built by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<&'static str>,
    /// Extra headers set by handlers
    pub headers: HeaderVec,
    pub body: Vec<u8>,
    /// Set once a stage rendered into this response
    pub rendered: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: None,
            headers: HeaderVec::new(),
            body: Vec::new(),
            rendered: false,
        }
    }
}

impl Response {
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if let Some(slot) = self.headers.iter_mut().find(|(k, _)| k.as_ref() == name) {
            slot.1 = value;
        } else {
            self.headers.push((Arc::from(name), value));
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body as UTF-8 text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Reason phrase for a status code.
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Full `Content-Type` header line for the content types this crate produces.
fn content_type_line(content_type: &'static str) -> &'static str {
    match content_type {
        "text/html; charset=utf-8" => "Content-Type: text/html; charset=utf-8",
        "text/plain; charset=utf-8" => "Content-Type: text/plain; charset=utf-8",
        "application/json" => "Content-Type: application/json",
        "application/xml" => "Content-Type: application/xml",
        "text/css" => "Content-Type: text/css",
        "application/javascript" => "Content-Type: application/javascript",
        "image/svg+xml" => "Content-Type: image/svg+xml",
        "image/png" => "Content-Type: image/png",
        "image/jpeg" => "Content-Type: image/jpeg",
        "image/gif" => "Content-Type: image/gif",
        "image/x-icon" => "Content-Type: image/x-icon",
        "application/wasm" => "Content-Type: application/wasm",
        _ => "Content-Type: application/octet-stream",
    }
}

/// `Name: value` line for a handler-set header, with CR/LF removed.
#[must_use]
pub fn header_line(name: &str, value: &str) -> String {
    let clean = |s: &str| s.chars().filter(|c| *c != '\r' && *c != '\n').collect::<String>();
    format!("{}: {}", clean(name), clean(value))
}

/// Copy `response` into the `may_minihttp` response.
///
/// `may_minihttp` only takes `&'static str` header lines, so handler-set
/// headers are leaked per response. Content-Length is always written by the
/// transport.
pub fn write_response(out: &mut may_minihttp::Response, response: Response) {
    out.status_code(usize::from(response.status), status_reason(response.status));
    if let Some(ct) = response.content_type {
        out.header(content_type_line(ct));
    }
    for (name, value) in &response.headers {
        let name: &str = name;
        if name == "content-length" || (name == "content-type" && response.content_type.is_some()) {
            continue;
        }
        let line = header_line(name, value).into_boxed_str();
        out.header(Box::leak(line));
    }
    out.body_vec(response.body);
}
