//! Integration tests for the `may_minihttp` transport
//!
//! Each test binds a free local port, starts the server and talks raw
//! HTTP/1.1 over a `TcpStream`.

use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use switchyard::render::RenderOptions;
use switchyard::server::{HttpServer, ServerHandle};
use switchyard::{App, AppConfig, Context, Mode};

fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn start(app: App) -> (Arc<App>, ServerHandle) {
    may::config().set_stack_size(0x8000);
    let app = app.warmup().unwrap();
    let handle = HttpServer::new(Arc::clone(&app)).start(free_addr()).unwrap();
    handle.wait_ready().unwrap();
    (app, handle)
}

fn test_app(mode: Mode) -> App {
    let config = AppConfig {
        mode,
        ..AppConfig::default()
    };
    let mut app = App::new(config);
    app.routes()
        .get("/health", |ctx| {
            ctx.render(RenderOptions::json(json!({ "status": "ok" })))
        })
        .get("/fail", |_ctx| anyhow::bail!("database unavailable"))
        .get("/traced", |ctx| {
            ctx.res_mut().set_header("X-Trace", "abc");
            ctx.render(RenderOptions::text("ok"))
        })
        .post("/echo", |ctx| {
            let body = ctx.req().json().unwrap_or(Value::Null);
            ctx.render(RenderOptions::json(body).status(201))
        });
    app
}

fn send_request(addr: &SocketAddr, req: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    let mut buf = Vec::new();
    loop {
        let mut tmp = [0u8; 1024];
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("read error: {e:?}"),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn parse_response(resp: &str) -> (u16, String) {
    let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);
    (status, body.to_string())
}

#[test]
fn test_health_route_over_http() {
    let (_app, handle) = start(test_app(Mode::Production));
    let resp = send_request(
        &handle.addr(),
        "GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    let (status, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert!(resp.contains("application/json"));
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, json!({ "status": "ok" }));
    handle.stop();
}

#[test]
fn test_handler_headers_reach_the_wire() {
    let (_app, handle) = start(test_app(Mode::Production));
    let resp = send_request(
        &handle.addr(),
        "GET /traced HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    let (status, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert_eq!(body, "ok");
    assert!(resp.to_ascii_lowercase().contains("x-trace: abc\r\n"));
    handle.stop();
}

#[test]
fn test_post_body_reaches_route() {
    let (_app, handle) = start(test_app(Mode::Production));
    let payload = r#"{"name":"ada"}"#;
    let req = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}",
        payload.len()
    );
    let (status, body) = parse_response(&send_request(&handle.addr(), &req));
    assert_eq!(status, 201);
    assert_eq!(body, payload);
    handle.stop();
}

#[test]
fn test_unknown_path_is_404() {
    let (_app, handle) = start(test_app(Mode::Production));
    let resp = send_request(
        &handle.addr(),
        "GET /missing HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    let (status, body) = parse_response(&resp);
    assert_eq!(status, 404);
    assert!(body.contains("Page Not Found"));
    handle.stop();
}

#[test]
fn test_route_error_is_500_without_details_in_production() {
    let (_app, handle) = start(test_app(Mode::Production));
    let resp = send_request(&handle.addr(), "GET /fail HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let (status, body) = parse_response(&resp);
    assert_eq!(status, 500);
    assert!(!body.contains("database unavailable"));
    handle.stop();
}

#[test]
fn test_route_error_shows_details_in_development() {
    let (_app, handle) = start(test_app(Mode::Development));
    let resp = send_request(&handle.addr(), "GET /fail HTTP/1.1\r\nHost: localhost\r\n\r\n");
    let (status, body) = parse_response(&resp);
    assert_eq!(status, 500);
    assert!(body.contains("database unavailable"));
    handle.stop();
}

#[test]
fn test_static_asset_over_http() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hello from disk").unwrap();
    let config = AppConfig {
        static_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };
    let (_app, handle) = start(App::new(config));
    let resp = send_request(
        &handle.addr(),
        "GET /static/hello.txt HTTP/1.1\r\nHost: localhost\r\n\r\n",
    );
    let (status, body) = parse_response(&resp);
    assert_eq!(status, 200);
    assert_eq!(body, "hello from disk");
    handle.stop();
}

#[test]
fn test_upgrade_request_is_not_implemented() {
    let (_app, handle) = start(test_app(Mode::Production));
    let resp = send_request(
        &handle.addr(),
        "GET /ws HTTP/1.1\r\nHost: localhost\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
    );
    let (status, _body) = parse_response(&resp);
    assert_eq!(status, 501);
    handle.stop();
}

#[test]
fn test_server_back_reference_follows_lifecycle() {
    let (app, handle) = start(test_app(Mode::Production));
    let info = app.server().expect("server attached while running");
    assert_eq!(info.addr(), handle.addr());
    assert!(info.is_alive());

    handle.stop();
    assert!(app.server().is_none());
    assert!(!info.is_alive());
}
