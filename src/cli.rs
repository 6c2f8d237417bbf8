//! # CLI Module
//!
//! `switchyard serve` starts an HTTP server for a directory of static assets
//! with a `/health` route, using the full dispatch pipeline.
//!
//! ```bash
//! switchyard serve --addr 0.0.0.0:8080 --static-dir public --mode production
//! switchyard serve --config switchyard.yaml
//! ```
//!
//! Configuration precedence: `--config` file (or defaults), then
//! `SWITCHYARD_*` environment variables, then command-line flags.

use crate::app::App;
use crate::config::{AppConfig, Mode};
use crate::logging::{init_logging, LogConfig};
use crate::render::RenderOptions;
use crate::server::HttpServer;
use crate::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Command-line interface for switchyard.
#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Switchyard request dispatch server", long_about = None, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve static assets through the dispatch pipeline
    Serve {
        /// Address and port to bind the server to
        #[arg(long, default_value = "127.0.0.1:8080", env = "SWITCHYARD_ADDR")]
        addr: String,

        /// Directory with static assets (overrides config)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Operating mode (overrides config and SWITCHYARD_MODE)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Development,
    Production,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Development => Mode::Development,
            ModeArg::Production => Mode::Production,
        }
    }
}

fn load_config(
    config: Option<&PathBuf>,
    static_dir: Option<&PathBuf>,
    mode: Option<ModeArg>,
) -> anyhow::Result<AppConfig> {
    let mut app_config = match config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    app_config.apply_env();
    apply_flags(&mut app_config, static_dir, mode);
    Ok(app_config)
}

fn apply_flags(config: &mut AppConfig, static_dir: Option<&PathBuf>, mode: Option<ModeArg>) {
    if let Some(dir) = static_dir {
        config.static_dir = dir.clone();
    }
    if let Some(mode) = mode {
        config.mode = mode.into();
    }
}

fn build_app(config: AppConfig) -> anyhow::Result<std::sync::Arc<App>> {
    let mut app = App::new(config);
    app.routes().get("/health", |ctx| {
        ctx.render(RenderOptions::json(json!({ "status": "ok" })))
    });
    app.warmup()
}

/// Parse arguments and run the selected command.
///
/// # Errors
///
/// Configuration, logging and server startup failures.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            addr,
            static_dir,
            config,
            mode,
        } => {
            let config = load_config(config.as_ref(), static_dir.as_ref(), mode)?;
            init_logging(&LogConfig::from_env(config.mode))?;
            config.apply_runtime();

            let app = build_app(config)?;
            let handle = HttpServer::new(app).start(addr.as_str())?;
            info!(addr = %handle.addr(), "Listening");
            wait_for_shutdown(handle)
        }
    }
}

#[cfg(unix)]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
