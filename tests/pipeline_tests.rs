//! Tests for the dispatch pipeline and exception boundary
//!
//! # Test Coverage
//!
//! - Hook ordering and short-circuit on "handled"
//! - Static short-circuit before the router
//! - Router errors caught once by the exception boundary
//! - Not-found fallback in development and production mode
//! - Capability registration, collisions and calls through the context
//! - Exactly one outcome per plain request

mod common;

use common::{counting_app, Behavior};
use http::Method;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use switchyard::capability::Capability;
use switchyard::config::ExceptionFormat;
use switchyard::context::RequestContext;
use switchyard::hooks;
use switchyard::render::{RenderOptions, Rendered, Renderer};
use switchyard::{
    App, AppConfig, ConfigurationError, Context, Mode, Outcome, Request, Response,
};

fn get(app: &Arc<App>, path: &str) -> RequestContext {
    app.new_http_context(Request::new(Method::GET, path))
}

fn response(ctx: RequestContext) -> Response {
    ctx.into_http().unwrap().into_response()
}

#[test]
fn test_request_hooks_run_in_order_and_stop_at_handled() {
    let (mut app, statics, router) = counting_app(Mode::Development, Behavior::Handle(200), Behavior::Handle(200));
    let calls = Arc::new(Mutex::new(Vec::new()));
    for (name, handled) in [("h1", false), ("h2", true), ("h3", false)] {
        let calls = Arc::clone(&calls);
        app.add_hook(hooks::REQUEST, move |_ctx| {
            calls.lock().push(name);
            Ok(handled)
        });
    }
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/anything");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Hook);
    assert_eq!(*calls.lock(), vec!["h1", "h2"]);
    assert_eq!(statics.count(), 0);
    assert_eq!(router.count(), 0);
}

#[test]
fn test_static_short_circuits_router_and_keeps_status() {
    let (app, statics, router) = counting_app(Mode::Production, Behavior::Handle(203), Behavior::Handle(200));
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/static/app.css");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Static);
    assert_eq!(statics.count(), 1);
    assert_eq!(router.count(), 0);
    let res = response(ctx);
    assert_eq!(res.status, 203);
    assert_eq!(res.body, b"asset");
}

#[test]
fn test_static_files_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("site.css"), "body {}").unwrap();
    let config = AppConfig {
        static_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };
    let mut app = App::new(config);
    let routed = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&routed);
    app.routes().any("/static/{file}", move |ctx| {
        r.fetch_add(1, Ordering::SeqCst);
        ctx.render(RenderOptions::text("route"))
    });
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/static/site.css");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Static);
    let res = response(ctx);
    assert_eq!(res.content_type, Some("text/css"));
    assert_eq!(res.body, b"body {}");

    // missing asset falls through to the router
    let mut ctx = get(&app, "/static/missing.css");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Route);
    assert_eq!(routed.load(Ordering::SeqCst), 1);

    let mut ctx = get(&app, "/static/../Cargo.toml");
    assert_ne!(app.handle_request(&mut ctx), Outcome::Static);
}

#[test]
fn test_router_error_production_renders_generic_500() {
    let (app, statics, router) = counting_app(Mode::Production, Behavior::Decline, Behavior::Fail);
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/explode");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Exception);
    assert_eq!(statics.count(), 1);
    assert_eq!(router.count(), 1);

    assert_eq!(ctx.core().error().unwrap().to_string(), "boom");
    assert_eq!(ctx.stash()["exception"]["message"], json!("boom"));
    let res = response(ctx);
    assert_eq!(res.status, 500);
    assert_eq!(res.content_type, Some("text/html; charset=utf-8"));
    let body = res.text();
    assert!(body.contains("Internal Server Error"));
    assert!(!body.contains("boom"));
}

#[test]
fn test_router_error_development_renders_diagnostics() {
    let (app, _statics, _router) = counting_app(Mode::Development, Behavior::Decline, Behavior::Fail);
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/explode");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Exception);
    let res = response(ctx);
    assert_eq!(res.status, 500);
    let body = res.text();
    assert!(body.contains("boom"));
    // html views auto-escape
    assert!(body.contains("<td>&#x2f;explode</td>"));
}

#[test]
fn test_exception_json_format() {
    let mut config = common::config(Mode::Development);
    config.exception_format = ExceptionFormat::Json;
    let mut app = App::new(config);
    app.routes().get("/fail", |_ctx| {
        Err(anyhow::anyhow!("disk full").context("saving upload"))
    });
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/fail");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Exception);
    let res = response(ctx);
    assert_eq!(res.status, 500);
    assert_eq!(res.content_type, Some("application/json"));
    let body: Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body["status"], json!(500));
    assert_eq!(body["path"], json!("/fail"));
    assert_eq!(body["exception"]["message"], json!("saving upload"));
    assert_eq!(body["exception"]["causes"], json!(["disk full"]));
}

#[test]
fn test_not_found_production_and_development() {
    for (mode, marker) in [(Mode::Production, "Page Not Found"), (Mode::Development, "Request ID")] {
        let (app, statics, router) = counting_app(mode, Behavior::Decline, Behavior::Decline);
        let app = app.warmup().unwrap();

        let mut ctx = get(&app, "/nope");
        assert_eq!(app.handle_request(&mut ctx), Outcome::NotFound);
        assert_eq!(statics.count(), 1);
        assert_eq!(router.count(), 1);
        assert!(ctx.stash().get("exception").is_none());
        let res = response(ctx);
        assert_eq!(res.status, 404);
        assert!(res.text().contains(marker), "{mode}: {}", res.text());
    }
}

#[test]
fn test_hook_error_skips_later_stages() {
    let (mut app, statics, router) = counting_app(Mode::Production, Behavior::Handle(200), Behavior::Handle(200));
    app.add_hook(hooks::REQUEST, |_ctx| anyhow::bail!("hook broke"));
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Exception);
    assert_eq!(statics.count(), 0);
    assert_eq!(router.count(), 0);
    assert_eq!(response(ctx).status, 500);
}

#[test]
fn test_static_error_skips_router() {
    let (app, statics, router) = counting_app(Mode::Production, Behavior::Fail, Behavior::Handle(200));
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Exception);
    assert_eq!(statics.count(), 1);
    assert_eq!(router.count(), 0);
}

#[test]
fn test_plain_request_has_exactly_one_outcome() {
    let cases = [
        (Behavior::Handle(200), Behavior::Handle(200), Outcome::Static),
        (Behavior::Decline, Behavior::Handle(200), Outcome::Route),
        (Behavior::Decline, Behavior::Decline, Outcome::NotFound),
        (Behavior::Decline, Behavior::Fail, Outcome::Exception),
    ];
    for (static_behavior, router_behavior, expected) in cases {
        let (mut app, statics, router) = counting_app(Mode::Production, static_behavior, router_behavior);
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hook_calls);
        app.add_hook(hooks::REQUEST, move |_ctx| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(false)
        });
        let app = app.warmup().unwrap();

        let mut ctx = get(&app, "/x");
        let outcome = app.handle_request(&mut ctx);
        assert_eq!(outcome, expected);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);

        assert_eq!(statics.count(), 1);
        let router_ran = usize::from(expected != Outcome::Static);
        assert_eq!(router.count(), router_ran, "{expected:?}");
        assert_eq!(ctx.core().error().is_some(), expected == Outcome::Exception);

        let res = response(ctx);
        assert!(res.rendered);
    }
}

#[test]
fn test_route_params_and_methods() {
    let mut app = App::new(AppConfig::default());
    app.routes()
        .get("/users/{id}", |ctx| {
            let id = ctx.param("id").unwrap_or_default().to_string();
            ctx.render(RenderOptions::json(json!({ "id": id })))
        })
        .post("/users", |ctx| {
            let body = ctx.req().json().unwrap_or(Value::Null);
            ctx.render(RenderOptions::json(body).status(201))
        });
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/users/42");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Route);
    assert_eq!(response(ctx).body, br#"{"id":"42"}"#);

    let req = Request::new(Method::POST, "/users").with_body(br#"{"name":"ada"}"#.to_vec());
    let mut ctx = app.new_http_context(req);
    assert_eq!(app.handle_request(&mut ctx), Outcome::Route);
    let res = response(ctx);
    assert_eq!(res.status, 201);
    assert_eq!(res.body, br#"{"name":"ada"}"#);

    let mut ctx = app.new_http_context(Request::new(Method::DELETE, "/users/42"));
    assert_eq!(app.handle_request(&mut ctx), Outcome::NotFound);
}

#[test]
fn test_duplicate_capability_fails_and_keeps_first() {
    let mut app = App::new(AppConfig::default());
    app.register_capability("title", Capability::method(|_ctx, _args| Ok(json!("first"))))
        .unwrap();
    let err = app
        .register_capability("title", Capability::method(|_ctx, _args| Ok(json!("second"))))
        .err()
        .unwrap();
    assert_eq!(
        err,
        ConfigurationError::NameCollision {
            name: "title".to_string()
        }
    );
    assert!(app.add_helper("title", |_ctx, _args| Ok(Value::Null)).is_err());

    app.routes().get("/", |ctx| {
        let title = ctx.call("title", &[])?;
        ctx.render(RenderOptions::json(title))
    });
    let app = app.warmup().unwrap();
    assert_eq!(app.capabilities().len(), 1);

    let mut ctx = get(&app, "/");
    assert_eq!(ctx.call("title", &[]).unwrap(), json!("first"));
    assert_eq!(app.handle_request(&mut ctx), Outcome::Route);
    assert_eq!(response(ctx).body, br#""first""#);
}

#[test]
fn test_reserved_capability_name_is_rejected() {
    let mut app = App::new(AppConfig::default());
    let err = app
        .add_helper("render", |_ctx, _args| Ok(Value::Null))
        .err()
        .unwrap();
    assert!(matches!(err, ConfigurationError::ReservedName { .. }));
}

#[test]
fn test_accessor_capability_reads_and_writes_stash() {
    let mut app = App::new(AppConfig::default());
    app.register_capability(
        "user",
        Capability::accessor(
            |ctx| Ok(ctx.stash().get("user").cloned().unwrap_or(Value::Null)),
            |ctx, value| {
                ctx.stash_mut().insert("user".to_string(), value);
                Ok(())
            },
        ),
    )
    .unwrap();
    app.add_helper("shout", |_ctx, args| {
        let text = args.first().and_then(Value::as_str).unwrap_or_default();
        Ok(json!(text.to_uppercase()))
    })
    .unwrap();
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/");
    assert_eq!(ctx.get("user").unwrap(), Value::Null);
    ctx.set("user", json!("ada")).unwrap();
    assert_eq!(ctx.get("user").unwrap(), json!("ada"));
    assert_eq!(ctx.call("shout", &[json!("hi")]).unwrap(), json!("HI"));
    assert!(ctx.call("user", &[]).is_err());
    assert!(ctx.get("missing").is_err());
}

#[test]
fn test_plugin_bundles_hooks_and_helpers() {
    let mut app = App::new(AppConfig::default());
    app.plugin(|app| {
        app.add_helper("version", |_ctx, _args| Ok(json!("1.0")))?;
        app.add_hook(hooks::REQUEST, |ctx| {
            if ctx.path() == "/version" {
                let version = ctx.call("version", &[])?;
                ctx.render(RenderOptions::json(version))?;
                return Ok(true);
            }
            Ok(false)
        });
        Ok(())
    })
    .unwrap();
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/version");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Hook);
    assert_eq!(response(ctx).body, br#""1.0""#);
}

struct BrokenRenderer;

impl Renderer for BrokenRenderer {
    fn render(&self, _ctx: &dyn Context, _options: &RenderOptions) -> anyhow::Result<Rendered> {
        anyhow::bail!("view missing")
    }
}

/// Records every render as `(view, status)`.
#[derive(Clone, Default)]
struct RecordingRenderer {
    renders: Arc<Mutex<Vec<(Option<String>, Option<u16>)>>>,
}

impl RecordingRenderer {
    fn statuses(&self) -> Vec<Option<u16>> {
        self.renders.lock().iter().map(|(_, status)| *status).collect()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&self, _ctx: &dyn Context, options: &RenderOptions) -> anyhow::Result<Rendered> {
        self.renders
            .lock()
            .push((options.view.clone(), options.status));
        Ok(Rendered {
            content_type: "text/plain; charset=utf-8",
            body: b"rendered".to_vec(),
        })
    }
}

#[test]
fn test_router_error_reported_exactly_once() {
    let (mut app, _statics, _router) = counting_app(Mode::Production, Behavior::Decline, Behavior::Fail);
    let renderer = RecordingRenderer::default();
    app.set_renderer(renderer.clone());
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/explode");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Exception);
    assert_eq!(
        *renderer.renders.lock(),
        vec![(Some("exception".to_string()), Some(500))]
    );
    assert_eq!(response(ctx).status, 500);
}

#[test]
fn test_hook_error_reported_once_without_not_found() {
    let (mut app, statics, router) = counting_app(Mode::Development, Behavior::Decline, Behavior::Decline);
    app.add_hook(hooks::REQUEST, |_ctx| anyhow::bail!("hook broke"));
    let renderer = RecordingRenderer::default();
    app.set_renderer(renderer.clone());
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/anything");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Exception);
    assert_eq!(statics.count(), 0);
    assert_eq!(router.count(), 0);
    assert_eq!(renderer.statuses(), vec![Some(500)]);
}

#[test]
fn test_not_found_renders_once_without_exception() {
    let (mut app, _statics, _router) = counting_app(Mode::Production, Behavior::Decline, Behavior::Decline);
    let renderer = RecordingRenderer::default();
    app.set_renderer(renderer.clone());
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/nope");
    assert_eq!(app.handle_request(&mut ctx), Outcome::NotFound);
    assert_eq!(
        *renderer.renders.lock(),
        vec![(Some("not_found".to_string()), Some(404))]
    );
}

#[test]
fn test_boundary_render_failure_is_faulted() {
    let (mut app, _statics, _router) = counting_app(Mode::Production, Behavior::Decline, Behavior::Fail);
    app.set_renderer(BrokenRenderer);
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Faulted);
    assert!(ctx.core().is_faulted());
    assert!(ctx.core().error().is_some());
}

#[test]
fn test_not_found_render_failure_is_faulted() {
    let (mut app, _statics, router) = counting_app(Mode::Development, Behavior::Decline, Behavior::Decline);
    app.set_renderer(BrokenRenderer);
    let app = app.warmup().unwrap();

    let mut ctx = get(&app, "/");
    assert_eq!(app.handle_request(&mut ctx), Outcome::Faulted);
    assert_eq!(router.count(), 1);
    assert!(ctx.core().error().is_none());
}

#[test]
fn test_request_id_is_taken_from_header() {
    let app = App::new(AppConfig::default()).warmup().unwrap();
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let ctx = app.new_http_context(Request::new(Method::GET, "/").with_header("X-Request-Id", id));
    assert_eq!(ctx.request_id().to_string(), id);
}

#[test]
fn test_server_is_none_without_transport() {
    let app = App::new(AppConfig::default()).warmup().unwrap();
    assert!(app.server().is_none());
}
