//! Structured logging initialization.
//!
//! Every component logs through `tracing` with structured fields
//! (`request_id`, `path`, `hook`, `stage`). This module installs the
//! subscriber: JSON lines for production, pretty output for development.
//!
//! ## Environment Variables
//!
//! - `SWITCHYARD_LOG_LEVEL`: trace/debug/info/warn/error (default depends on mode)
//! - `SWITCHYARD_LOG_FORMAT`: json/pretty (default depends on mode)
//! - `SWITCHYARD_LOG_TARGET_FILTER`: extra comma-separated filter directives
//! - `SWITCHYARD_LOG_INCLUDE_LOCATION`: include file:line in events
//!
//! `RUST_LOG` takes precedence over the level when set.

use crate::config::Mode;
use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    /// Log format: json/pretty
    pub format: LogFormat,
    /// Additional filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl LogConfig {
    /// Defaults for the given mode: development logs everything pretty,
    /// production logs info and above as JSON.
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Development => Self {
                log_level: "trace".to_string(),
                format: LogFormat::Pretty,
                target_filter: None,
                include_location: true,
            },
            Mode::Production => Self {
                log_level: "info".to_string(),
                format: LogFormat::Json,
                target_filter: None,
                include_location: false,
            },
        }
    }

    /// Mode defaults overridden by `SWITCHYARD_LOG_*` variables.
    pub fn from_env(mode: Mode) -> Self {
        let mut config = Self::for_mode(mode);
        if let Ok(level) = env::var("SWITCHYARD_LOG_LEVEL") {
            config.log_level = level;
        }
        if let Ok(format) = env::var("SWITCHYARD_LOG_FORMAT") {
            config.format = LogFormat::parse(&format);
        }
        config.target_filter = env::var("SWITCHYARD_LOG_TARGET_FILTER").ok();
        if let Some(include) = env::var("SWITCHYARD_LOG_INCLUDE_LOCATION")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.include_location = include;
        }
        config
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        // may_minihttp reports every client disconnect; keep it at warn+.
        if let Ok(directive) = "may_minihttp=warn".parse() {
            env_filter = env_filter.add_directive(directive);
        }

        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',').map(str::trim) {
                if filter.is_empty() {
                    continue;
                }
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {filter}"),
                }
            }
        }
        env_filter
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use switchyard::config::Mode;
/// use switchyard::logging::{init_logging, LogConfig};
///
/// init_logging(&LogConfig::from_env(Mode::Production)).expect("logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Json);
    }

    #[test]
    fn test_mode_defaults() {
        let dev = LogConfig::for_mode(Mode::Development);
        assert_eq!(dev.level(), Level::TRACE);
        assert_eq!(dev.format, LogFormat::Pretty);

        let prod = LogConfig::for_mode(Mode::Production);
        assert_eq!(prod.level(), Level::INFO);
        assert_eq!(prod.format, LogFormat::Json);
        assert!(!prod.include_location);
    }
}
