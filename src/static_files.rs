//! # Static Files
//!
//! The static collaborator consulted by the dispatch pipeline after the
//! `request` hook and before the router. [`StaticDispatch::dispatch`] returns
//! `Ok(true)` only when it served an asset; any status it sets on the
//! response is left alone by the pipeline.
//!
//! [`StaticFiles`] serves `GET` and `HEAD` requests under a URL prefix from a
//! directory. Paths containing `..`, roots or prefixes are rejected before
//! touching the filesystem.

use crate::context::HttpContext;
use http::Method;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Static collaborator contract.
pub trait StaticDispatch: Send + Sync {
    /// Called once by [`App::warmup`](crate::app::App::warmup).
    fn warmup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Serve the request if it names an asset. `Ok(true)` iff it was served.
    fn dispatch(&self, ctx: &mut HttpContext) -> anyhow::Result<bool>;
}

/// Collaborator that never serves anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStatic;

impl StaticDispatch for NoStatic {
    fn dispatch(&self, _ctx: &mut HttpContext) -> anyhow::Result<bool> {
        Ok(false)
    }
}

/// Directory-backed static asset server.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
    prefix: String,
}

impl StaticFiles {
    /// Serve `base` under the default `/static/` prefix.
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
            prefix: "/static/".to_string(),
        }
    }

    /// Change the URL prefix. A trailing `/` is added when missing.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let mut prefix = prefix.to_string();
        if !prefix.starts_with('/') {
            prefix.insert(0, '/');
        }
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.prefix = prefix;
        self
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn map_path(&self, rel_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(rel_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
    }

    /// Read the asset at `url_path` (already stripped of the prefix).
    ///
    /// # Errors
    ///
    /// `NotFound` for traversal attempts, missing files and directories;
    /// other I/O errors unchanged.
    pub fn load(&self, rel_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(rel_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

impl StaticDispatch for StaticFiles {
    fn warmup(&mut self) -> anyhow::Result<()> {
        if !self.base_dir.is_dir() {
            warn!(dir = %self.base_dir.display(), "Static directory does not exist");
        }
        Ok(())
    }

    fn dispatch(&self, ctx: &mut HttpContext) -> anyhow::Result<bool> {
        let method = ctx.req().method.clone();
        if method != Method::GET && method != Method::HEAD {
            return Ok(false);
        }
        let head = method == Method::HEAD;
        let Some(rel) = ctx.req().path.strip_prefix(self.prefix.as_str()) else {
            return Ok(false);
        };

        let (bytes, content_type) = match self.load(rel) {
            Ok(found) => found,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %ctx.req().path, "No static asset");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            path = %ctx.req().path,
            content_type,
            size = bytes.len(),
            "Serving static asset"
        );
        let res = ctx.res_mut();
        res.status = 200;
        res.content_type = Some(content_type);
        res.body = if head { Vec::new() } else { bytes };
        res.rendered = true;
        Ok(true)
    }
}
