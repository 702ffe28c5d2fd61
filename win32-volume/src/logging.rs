//! Logging setup.
//!
//! The library only emits `tracing` events. Hosts that want them on stderr
//! call one of the initializers here once; later calls are no-ops.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Logging mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact stderr output at `info`
    Development,
    /// Verbose output with thread ids and source locations at `debug`
    Debug,
}

/// Logging configuration error.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },
}

/// Initialize logging with the specified mode.
///
/// # Environment Variables
///
/// - `WIN32_VOLUME_LOG_LEVEL`: filter directive overriding the mode's level
/// - `RUST_LOG`: used when `WIN32_VOLUME_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let filter = env_filter("info")?;
            install(filter, false)
        }
        LoggingMode::Debug => {
            let filter = env_filter("debug")?;
            install(filter, true)
        }
    }
}

/// Initialize logging from `WIN32_VOLUME_LOG_MODE` ("development" or "debug").
///
/// Defaults to silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    init_logging(mode_from_str(
        std::env::var("WIN32_VOLUME_LOG_MODE").ok().as_deref(),
    ))
}

/// Initialize compact stderr logging with an explicit filter directive
/// (e.g. `"debug"` or `"win32_volume=trace"`).
pub fn init_with_filter(directive: &str) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_new(directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive.to_string(),
        reason: e.to_string(),
    })?;
    install(filter, false)
}

/// Check if a global subscriber has been installed.
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

fn mode_from_str(value: Option<&str>) -> LoggingMode {
    match value {
        Some("development") => LoggingMode::Development,
        Some("debug") => LoggingMode::Debug,
        _ => LoggingMode::Silent,
    }
}

fn env_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = std::env::var("WIN32_VOLUME_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default_level.to_string());

    EnvFilter::try_new(&directive).map_err(|e| LoggingError::InvalidFilter {
        filter: directive,
        reason: e.to_string(),
    })
}

fn install(filter: EnvFilter, verbose: bool) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    if is_initialized() {
        return Ok(());
    }

    let result = if verbose {
        Registry::default()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init()
    } else {
        Registry::default()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .compact(),
            )
            .with(filter)
            .try_init()
    };

    result.map_err(|e| LoggingError::TracingInit(e.to_string()))
}
