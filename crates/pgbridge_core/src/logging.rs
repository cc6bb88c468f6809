//! Structured logging setup with stderr and optional file output.
//!
//! Provides:
//! - Non-blocking stderr output (stdout carries STATE lines and results)
//! - Daily rotating log files when `log_dir` is configured
//! - Level taken from the configured `logging_level`
//! - Environment variable override via PGBRIDGE_LOG or RUST_LOG

use crate::models::{LoggingLevel, TargetConfig};

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
pub struct LogConfig {
    /// Directory for log files; stderr only when unset
    pub log_dir: Option<PathBuf>,
    /// Whether stderr is a terminal (enables ANSI colours)
    pub is_tty: bool,
    /// Level from the target configuration
    pub level: Option<LoggingLevel>,
}

impl LogConfig {
    /// Create a stderr-only logging configuration.
    pub fn new() -> Self {
        Self { log_dir: None, is_tty: atty::is(atty::Stream::Stderr), level: None }
    }

    /// Derive logging settings from a loaded target configuration.
    pub fn from_target(config: &TargetConfig) -> Self {
        Self { log_dir: config.log_dir.clone(), level: config.logging_level, ..Self::new() }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that must be held for the lifetime of the process.
///
/// Dropping this guard flushes pending log entries.
pub struct LoggingGuard {
    _worker_guards: Vec<WorkerGuard>,
}

/// Initialize logging with the given configuration.
///
/// If file logging cannot be set up, falls back to stderr only.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    let (stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let mut guards = vec![stderr_guard];
    let env_filter = build_env_filter(config.level);

    let file_writer = match &config.log_dir {
        Some(dir) => match file_appender(dir) {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                guards.push(guard);
                Some(writer)
            }
            Err(e) => {
                eprintln!("Warning: Failed to initialize file logging: {e}. Using stderr only.");
                None
            }
        },
        None => None,
    };

    let result = match file_writer {
        Some(file) => tracing_subscriber::fmt()
            .with_writer(stderr.and(file))
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_target(true)
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_writer(stderr)
            .with_env_filter(env_filter)
            .with_ansi(config.is_tty)
            .with_target(false)
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {e}");
    }

    LoggingGuard { _worker_guards: guards }
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pgbridge")
        .filename_suffix("log")
        .build(dir)?;
    Ok(appender)
}

/// Build the environment filter.
///
/// Priority: PGBRIDGE_LOG > RUST_LOG > configured level > build default.
pub fn build_env_filter(level: Option<LoggingLevel>) -> EnvFilter {
    EnvFilter::try_from_env("PGBRIDGE_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(level_filter(level)))
}

/// Filter directives for a configured level, or the build default.
pub fn level_filter(level: Option<LoggingLevel>) -> String {
    match level {
        Some(level) => {
            let directive = level.filter_directive();
            format!("warn,pgbridge={directive},pgbridge_core={directive},tokio_postgres=warn")
        }
        None => default_log_filter().to_string(),
    }
}

/// Get the default log filter based on build type.
pub fn default_log_filter() -> &'static str {
    #[cfg(debug_assertions)]
    {
        "info,pgbridge=debug,pgbridge_core=debug,tokio_postgres=warn"
    }
    #[cfg(not(debug_assertions))]
    {
        "warn,pgbridge=info,pgbridge_core=info,tokio_postgres=warn"
    }
}
