//! # Hook Registry
//!
//! Named, ordered lists of callbacks run by the dispatch pipeline.
//!
//! - Entries for one name run strictly in registration order, one at a time.
//! - A handler returning `Ok(true)` ("handled") stops the chain for that
//!   invocation only. Later entries stay registered for the next request.
//! - A handler returning `Err` stops the chain and the error propagates to the
//!   caller unchanged. The pipeline's exception boundary is the only catcher.
//! - The same handler may be registered several times on purpose; there is no
//!   duplicate detection and no priority ordering.
//!
//! The pipeline runs two hooks: [`REQUEST`] for plain requests and
//! [`WEBSOCKET`] for upgraded connections.

use crate::context::Context;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Hook run for every plain request before static and router dispatch.
pub const REQUEST: &str = "request";
/// Hook run for every upgraded connection before router dispatch.
pub const WEBSOCKET: &str = "websocket";

/// Hook callback. `Ok(true)` means the request has been handled.
pub type HookFn = Arc<dyn Fn(&mut dyn Context) -> anyhow::Result<bool> + Send + Sync>;

/// One registered hook handler.
#[derive(Clone)]
pub struct HookEntry {
    /// Global registration sequence number
    pub order: u64,
    handler: HookFn,
}

/// Ordered hook lists keyed by hook name.
#[derive(Default, Clone)]
pub struct Hooks {
    hooks: HashMap<String, Vec<HookEntry>>,
    next_order: u64,
}

impl Hooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the list for `name`.
    pub fn add_hook<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut dyn Context) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        let order = self.next_order;
        self.next_order += 1;
        self.hooks
            .entry(name.to_string())
            .or_default()
            .push(HookEntry {
                order,
                handler: Arc::new(handler),
            });
        debug!(hook = %name, order, "Hook registered");
    }

    /// Run every handler for `name` in order until one reports "handled".
    ///
    /// Returns `Ok(false)` when no handler is registered or none handled the
    /// request.
    ///
    /// # Errors
    ///
    /// The first handler error, unchanged. Later handlers do not run.
    pub fn run_hook(&self, name: &str, ctx: &mut dyn Context) -> anyhow::Result<bool> {
        let Some(entries) = self.hooks.get(name) else {
            return Ok(false);
        };

        for entry in entries {
            trace!(
                hook = %name,
                order = entry.order,
                request_id = %ctx.request_id(),
                "Running hook handler"
            );
            if (entry.handler)(&mut *ctx)? {
                debug!(
                    hook = %name,
                    order = entry.order,
                    request_id = %ctx.request_id(),
                    "Hook handled request"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Number of handlers registered for `name`.
    #[must_use]
    pub fn len(&self, name: &str) -> usize {
        self.hooks.get(name).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.values().all(Vec::is_empty)
    }
}
