//! Structured Logger
//!
//! Wraps `tracing` with a console layer (plain or JSON) and an optional
//! daily-rolling NDJSON file, with environment-based level control.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Logger settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Default filter when `RUST_LOG` is unset (e.g. `info`, `linkdrop=debug`).
    pub level: String,
    /// Directory for `linkdrop.log.YYYY-MM-DD` files; console only when `None`.
    pub dir: Option<PathBuf>,
    /// Emit JSON on the console instead of human-readable lines.
    pub json: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self { level: "info".to_string(), dir: None, json: false }
    }
}

/// Initialize the global structured logger. Later calls are no-ops.
pub fn init_logger(options: &LogOptions) {
    let console_layer: Box<dyn Layer<Registry> + Send + Sync> = if options.json {
        fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    };

    let file_layer = options.dir.as_ref().map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "linkdrop.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.level));

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init();
}
