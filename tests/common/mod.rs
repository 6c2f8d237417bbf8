//! Shared fixtures for integration tests: counting collaborators and app
//! builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use switchyard::router::RouteDispatch;
use switchyard::static_files::StaticDispatch;
use switchyard::{App, AppConfig, HttpContext, Mode, WebSocketContext};

/// What a counting collaborator does when called.
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    Decline,
    /// Handle the request with this status
    Handle(u16),
    Fail,
}

#[derive(Clone)]
pub struct CountingStatic {
    pub calls: Arc<AtomicUsize>,
    behavior: Behavior,
}

impl CountingStatic {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            behavior,
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StaticDispatch for CountingStatic {
    fn dispatch(&self, ctx: &mut HttpContext) -> anyhow::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Decline => Ok(false),
            Behavior::Handle(status) => {
                let res = ctx.res_mut();
                res.status = status;
                res.content_type = Some("text/plain; charset=utf-8");
                res.body = b"asset".to_vec();
                res.rendered = true;
                Ok(true)
            }
            Behavior::Fail => anyhow::bail!("static exploded"),
        }
    }
}

#[derive(Clone)]
pub struct CountingRouter {
    pub calls: Arc<AtomicUsize>,
    pub websocket_calls: Arc<AtomicUsize>,
    behavior: Behavior,
}

impl CountingRouter {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            websocket_calls: Arc::new(AtomicUsize::new(0)),
            behavior,
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn websocket_count(&self) -> usize {
        self.websocket_calls.load(Ordering::SeqCst)
    }
}

impl RouteDispatch for CountingRouter {
    fn dispatch(&self, ctx: &mut HttpContext) -> anyhow::Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Decline => Ok(false),
            Behavior::Handle(status) => {
                let res = ctx.res_mut();
                res.status = status;
                res.body = b"routed".to_vec();
                res.rendered = true;
                Ok(true)
            }
            Behavior::Fail => anyhow::bail!("boom"),
        }
    }

    fn dispatch_websocket(&self, _ctx: &mut WebSocketContext) -> anyhow::Result<bool> {
        self.websocket_calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Decline => Ok(false),
            Behavior::Handle(_) => Ok(true),
            Behavior::Fail => anyhow::bail!("boom"),
        }
    }
}

pub fn config(mode: Mode) -> AppConfig {
    AppConfig {
        mode,
        ..AppConfig::default()
    }
}

/// App with counting static and router collaborators installed.
pub fn counting_app(
    mode: Mode,
    static_behavior: Behavior,
    router_behavior: Behavior,
) -> (App, CountingStatic, CountingRouter) {
    let statics = CountingStatic::new(static_behavior);
    let router = CountingRouter::new(router_behavior);
    let mut app = App::new(config(mode));
    app.set_static(statics.clone()).set_router(router.clone());
    (app, statics, router)
}
