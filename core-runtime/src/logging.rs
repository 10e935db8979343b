//! # Logging & Tracing Infrastructure
//!
//! Configures the `tracing-subscriber` stack used by every binary and test
//! harness in the workspace: pretty output for development, compact or JSON
//! for production, with module-level filtering via `EnvFilter`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Pretty)
//!     .with_filter("core_sync=debug,sqlx=warn");
//!
//! init_logging(config).expect("Failed to initialize logging");
//!
//! tracing::info!("Mirror started");
//! ```

use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Compact;
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level when no filter is given
    pub level: Level,
    /// Custom filter string (e.g., "core_sync=debug,sqlx=warn"); `RUST_LOG`
    /// takes precedence when set
    pub filter: Option<String>,
    /// Display target module in logs
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return filter;
        }
        match &self.filter {
            Some(directives) => {
                EnvFilter::try_new(directives).unwrap_or_else(|_| self.level_filter())
            }
            None => self.level_filter(),
        }
    }

    fn level_filter(&self) -> EnvFilter {
        EnvFilter::new(self.level.to_string())
    }
}

/// Initialize the global tracing subscriber.
///
/// Must be called at most once per process; a second call reports an
/// [`Error::Internal`] instead of panicking so tests that race on
/// initialization stay quiet.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = config.env_filter();
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_target(config.display_target))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(config.display_target))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(config.display_target))
            .try_init(),
    };

    result.map_err(|e| Error::Internal(format!("Failed to set tracing subscriber: {}", e)))
}
