//! # Render Module
//!
//! The rendering collaborator used by [`Context::render`]. The pipeline only
//! needs it to accept a view name plus a status and produce a response body;
//! [`TemplateRenderer`] does that with `minijinja`.
//!
//! ## Views
//!
//! A view is looked up as `{view}.{format}` (for example `exception.json`).
//! The renderer ships three built-in views used by the exception boundary,
//! each in `html`, `json` and `txt`:
//!
//! - `debug`: verbose diagnostics (development mode)
//! - `exception`: generic internal error page
//! - `not_found`: generic not-found page
//!
//! Additional views come from [`TemplateRenderer::add_template`] or a
//! template directory ([`TemplateRenderer::with_dir`]).
//!
//! ## Template Context
//!
//! Every template sees `stash`, `request_id`, `path`, `method`, `mode` and
//! `status`. The exception boundary stashes the error under
//! `stash.exception` (`message`, `causes`, `detail`).

use crate::context::Context;
use minijinja::Environment;
use serde_json::{json, Value};
use std::path::Path;

const DEBUG_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Debug - {{ status }}</title></head>
  <body>
    <h1>{{ status }} {% if stash.exception %}Internal Server Error{% else %}Not Found{% endif %}</h1>
    <table>
      <tr><th>Request ID</th><td>{{ request_id }}</td></tr>
      <tr><th>Method</th><td>{{ method }}</td></tr>
      <tr><th>Path</th><td>{{ path }}</td></tr>
      <tr><th>Mode</th><td>{{ mode }}</td></tr>
    </table>
    {% if stash.exception %}
    <h2>{{ stash.exception.message }}</h2>
    <ul>{% for cause in stash.exception.causes %}<li>{{ cause }}</li>{% endfor %}</ul>
    <pre>{{ stash.exception.detail }}</pre>
    {% endif %}
  </body>
</html>
"#;

const DEBUG_JSON: &str = r#"{"status": {{ status }}, "request_id": {{ request_id|tojson }}, "method": {{ method|tojson }}, "path": {{ path|tojson }}, "exception": {{ (stash.exception or none)|tojson }}}"#;

const DEBUG_TXT: &str = "{{ status }} {{ method }} {{ path }} ({{ request_id }})\n\
{% if stash.exception %}{{ stash.exception.message }}\n\
{% for cause in stash.exception.causes %}  caused by: {{ cause }}\n{% endfor %}\n\
{{ stash.exception.detail }}\n{% endif %}";

const EXCEPTION_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Server Error</title></head>
  <body><h1>Internal Server Error</h1><p>Request {{ request_id }} could not be completed.</p></body>
</html>
"#;

const EXCEPTION_JSON: &str = r#"{"error": "Internal Server Error", "status": {{ status }}, "request_id": {{ request_id|tojson }}}"#;

const EXCEPTION_TXT: &str = "Internal Server Error\n";

const NOT_FOUND_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head><title>Page Not Found</title></head>
  <body><h1>Page Not Found</h1><p>{{ path }} does not exist.</p></body>
</html>
"#;

const NOT_FOUND_JSON: &str = r#"{"error": "Not Found", "status": {{ status }}, "path": {{ path|tojson }}}"#;

const NOT_FOUND_TXT: &str = "Not Found\n";

const BUILTIN_VIEWS: &[(&str, &str)] = &[
    ("debug.html", DEBUG_HTML),
    ("debug.json", DEBUG_JSON),
    ("debug.txt", DEBUG_TXT),
    ("exception.html", EXCEPTION_HTML),
    ("exception.json", EXCEPTION_JSON),
    ("exception.txt", EXCEPTION_TXT),
    ("not_found.html", NOT_FOUND_HTML),
    ("not_found.json", NOT_FOUND_JSON),
    ("not_found.txt", NOT_FOUND_TXT),
];

/// What to render and with which status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    /// View name, resolved as `{view}.{format}`
    pub view: Option<String>,
    /// View format (`html`, `json`, `txt`, ...); defaults to `html`
    pub format: Option<String>,
    /// Response status; defaults to 200
    pub status: Option<u16>,
    /// Plain text body
    pub text: Option<String>,
    /// JSON body
    pub json: Option<Value>,
    /// Inline template source
    pub inline: Option<String>,
}

impl RenderOptions {
    pub fn view(name: impl Into<String>) -> Self {
        Self {
            view: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn json(value: Value) -> Self {
        Self {
            json: Some(value),
            ..Self::default()
        }
    }

    pub fn inline(source: impl Into<String>) -> Self {
        Self {
            inline: Some(source.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Short human-readable description for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match (&self.view, &self.text, &self.json, &self.inline) {
            (Some(view), ..) => format!("view '{view}'"),
            (_, Some(_), ..) => "text".to_string(),
            (_, _, Some(_), _) => "json".to_string(),
            (.., Some(_)) => "inline template".to_string(),
            _ => "nothing".to_string(),
        }
    }
}

/// A rendered response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Rendering collaborator.
pub trait Renderer: Send + Sync {
    /// Called once by [`App::warmup`](crate::app::App::warmup).
    fn warmup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn render(&self, ctx: &dyn Context, options: &RenderOptions) -> anyhow::Result<Rendered>;
}

/// Content type for a view format.
#[must_use]
pub fn content_type_for_format(format: &str) -> &'static str {
    match format {
        "html" => "text/html; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "css" => "text/css",
        "js" => "application/javascript",
        _ => "application/octet-stream",
    }
}

/// `minijinja`-backed renderer with built-in error views.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Built-in sources are compile-time constants; a failure here is a bug
        // caught by the unit tests, so it is logged instead of propagated.
        for (name, source) in BUILTIN_VIEWS {
            if let Err(e) = env.add_template(name, source) {
                tracing::error!(template = %name, error = %e, "Built-in template failed to compile");
            }
        }
        Self { env }
    }

    /// Load additional views from `dir` (`{view}.{format}` file names).
    #[must_use]
    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.env.set_loader(minijinja::path_loader(dir.as_ref()));
        self
    }

    /// Register a view from source, replacing a built-in of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not compile.
    pub fn add_template(&mut self, name: &str, source: &str) -> anyhow::Result<()> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())?;
        Ok(())
    }

    fn template_context(ctx: &dyn Context, status: u16) -> Value {
        let method = ctx
            .as_http()
            .map(|http| http.req().method.as_str())
            .or_else(|| ctx.as_websocket().map(|ws| ws.req().method.as_str()))
            .unwrap_or("GET");
        json!({
            "stash": ctx.stash(),
            "request_id": ctx.request_id().to_string(),
            "path": ctx.path(),
            "method": method,
            "mode": ctx.app().mode().as_str(),
            "status": status,
        })
    }
}

impl Renderer for TemplateRenderer {
    fn warmup(&mut self) -> anyhow::Result<()> {
        for (name, _) in BUILTIN_VIEWS {
            self.env.get_template(name)?;
        }
        tracing::debug!(views = BUILTIN_VIEWS.len(), "Renderer warmed up");
        Ok(())
    }

    fn render(&self, ctx: &dyn Context, options: &RenderOptions) -> anyhow::Result<Rendered> {
        if let Some(text) = &options.text {
            return Ok(Rendered {
                content_type: content_type_for_format("txt"),
                body: text.clone().into_bytes(),
            });
        }
        if let Some(value) = &options.json {
            return Ok(Rendered {
                content_type: content_type_for_format("json"),
                body: serde_json::to_vec(value)?,
            });
        }

        let status = options.status.unwrap_or(200);
        let format = options.format.as_deref().unwrap_or("html");
        let context = Self::template_context(ctx, status);

        if let Some(source) = &options.inline {
            let body = self.env.render_str(source, &context)?;
            return Ok(Rendered {
                content_type: content_type_for_format(format),
                body: body.into_bytes(),
            });
        }

        let Some(view) = &options.view else {
            anyhow::bail!("render called without a view, text, json or inline template");
        };
        let name = format!("{view}.{format}");
        let body = self.env.get_template(&name)?.render(&context)?;
        Ok(Rendered {
            content_type: content_type_for_format(format),
            body: body.into_bytes(),
        })
    }
}
