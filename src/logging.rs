//! Logging configuration for the explanation engine.
//!
//! The engine emits structured events through `tracing`: per-order and
//! per-thread timings at debug level, and a warning when high attribute
//! cardinality forces the array key representation. This module provides a
//! small setup utility for hosts that have not installed their own
//! subscriber.

use tracing::Level;

/// Configuration for the engine's log output.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for the host application.
    pub level: Level,
    /// Log level for segment-lens events specifically.
    pub engine_level: Level,
    /// Whether to emit JSON-formatted log lines.
    pub json_format: bool,
    /// Environment filter override; when set, the levels above are ignored.
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            engine_level: Level::INFO,
            json_format: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose configuration with per-thread enumeration timings.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            engine_level: Level::DEBUG,
            json_format: false,
            env_filter: None,
        }
    }

    /// Quiet JSON output for production hosts.
    pub fn production() -> Self {
        Self {
            level: Level::WARN,
            engine_level: Level::INFO,
            json_format: true,
            env_filter: None,
        }
    }

    /// Sets the engine-specific log level.
    pub fn with_engine_level(mut self, level: Level) -> Self {
        self.engine_level = level;
        self
    }

    /// Sets a custom environment filter.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the environment filter string.
    pub fn env_filter(&self) -> String {
        if let Some(ref filter) = self.env_filter {
            filter.clone()
        } else {
            format!(
                "{},segment_lens={}",
                self.level.as_str().to_lowercase(),
                self.engine_level.as_str().to_lowercase()
            )
        }
    }
}

/// Initializes a global `tracing` subscriber from the given configuration.
///
/// Fails if a global subscriber is already installed; hosts with their own
/// telemetry stack should skip this and configure `tracing` themselves.
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
