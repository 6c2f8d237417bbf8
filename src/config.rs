//! # Configuration Module
//!
//! Application configuration for a switchyard [`App`](crate::app::App).
//!
//! ## Sources
//!
//! Configuration is assembled from, in increasing priority:
//!
//! 1. Built-in defaults ([`AppConfig::default`])
//! 2. A YAML file ([`AppConfig::from_file`])
//! 3. Environment variables ([`AppConfig::from_env`], [`AppConfig::apply_env`])
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `SWITCHYARD_MODE` | `development` or anything else (production) | `development` |
//! | `SWITCHYARD_EXCEPTION_FORMAT` | `html`, `json` or `txt` | `html` |
//! | `SWITCHYARD_STATIC_DIR` | Directory served by the static collaborator | `public` |
//! | `SWITCHYARD_STATIC_PREFIX` | URL prefix for static assets | `/static/` |
//! | `SWITCHYARD_TEMPLATE_DIR` | Directory with user view templates | unset |
//! | `SWITCHYARD_STACK_SIZE` | Coroutine stack size, decimal or `0x` hex | `0x10000` |
//!
//! ## Example File
//!
//! ```yaml
//! mode: production
//! exception_format: json
//! static_dir: ./public
//! stack_size: 0x8000
//! # Unknown keys are kept for the application in `settings`
//! greeting: hello
//! ```

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default coroutine stack size (64 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Operating mode of the application.
///
/// Only `development` enables verbose diagnostic views; every other mode name
/// is treated as production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("development") {
            Mode::Development
        } else {
            Mode::Production
        }
    }

    #[must_use]
    pub fn is_development(self) -> bool {
        self == Mode::Development
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

impl From<String> for Mode {
    fn from(s: String) -> Self {
        Mode::parse(&s)
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format used by the exception boundary when rendering error views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExceptionFormat {
    #[default]
    Html,
    Json,
    Text,
}

impl ExceptionFormat {
    /// Unknown names fall back to HTML.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => ExceptionFormat::Json,
            "txt" | "text" => ExceptionFormat::Text,
            _ => ExceptionFormat::Html,
        }
    }

    /// Template extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            ExceptionFormat::Html => "html",
            ExceptionFormat::Json => "json",
            ExceptionFormat::Text => "txt",
        }
    }
}

impl From<String> for ExceptionFormat {
    fn from(s: String) -> Self {
        ExceptionFormat::parse(&s)
    }
}

impl From<ExceptionFormat> for String {
    fn from(format: ExceptionFormat) -> Self {
        format.extension().to_string()
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Development or production
    pub mode: Mode,
    /// Format of exception and not-found views
    pub exception_format: ExceptionFormat,
    /// Directory served by [`StaticFiles`](crate::static_files::StaticFiles)
    pub static_dir: PathBuf,
    /// URL prefix under which static assets are served
    pub static_prefix: String,
    /// Optional directory with user view templates
    pub template_dir: Option<PathBuf>,
    /// Coroutine stack size in bytes
    #[serde(deserialize_with = "deserialize_stack_size")]
    pub stack_size: usize,
    /// Application-specific settings (every key not listed above)
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Development,
            exception_format: ExceptionFormat::Html,
            static_dir: PathBuf::from("public"),
            static_prefix: "/static/".to_string(),
            template_dir: None,
            stack_size: DEFAULT_STACK_SIZE,
            settings: Map::new(),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `SWITCHYARD_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML for
    /// this structure.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Apply `SWITCHYARD_*` environment overrides on top of this config.
    pub fn apply_env(&mut self) {
        if let Ok(mode) = env::var("SWITCHYARD_MODE") {
            self.mode = Mode::parse(&mode);
        }
        if let Ok(format) = env::var("SWITCHYARD_EXCEPTION_FORMAT") {
            self.exception_format = ExceptionFormat::parse(&format);
        }
        if let Ok(dir) = env::var("SWITCHYARD_STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = env::var("SWITCHYARD_STATIC_PREFIX") {
            self.static_prefix = prefix;
        }
        if let Ok(dir) = env::var("SWITCHYARD_TEMPLATE_DIR") {
            self.template_dir = Some(PathBuf::from(dir));
        }
        if let Some(size) = env::var("SWITCHYARD_STACK_SIZE")
            .ok()
            .and_then(|s| parse_stack_size(&s))
        {
            self.stack_size = size;
        }
    }

    /// Configure the `may` runtime from this config.
    ///
    /// Must run before the first coroutine is spawned to take effect.
    pub fn apply_runtime(&self) {
        may::config().set_stack_size(self.stack_size);
    }

    /// Look up an application setting.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// Parse a stack size given in decimal (`16384`) or hex (`0x4000`).
pub fn parse_stack_size(s: &str) -> Option<usize> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

fn deserialize_stack_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => parse_stack_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack size '{s}'"))),
    }
}
