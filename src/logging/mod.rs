//! Logging configuration and initialization
//!
//! Centralized logging setup on the `tracing` ecosystem. Supports
//! human-readable and JSON output, configurable via environment variables or
//! programmatically.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Standard tracing filter (e.g., "info", "forgeprobe=debug")
//! - `FORGEPROBE_LOG_LEVEL`: Simple log level (error, warn, info, debug, trace)
//! - `FORGEPROBE_LOG_FORMAT`: Output format ("human" or "json")

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Tracks whether a subscriber has already been installed
static TRACING_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Environment variable for log level override
const LOG_LEVEL_ENV: &str = "FORGEPROBE_LOG_LEVEL";

/// Environment variable for log format (human/json)
const LOG_FORMAT_ENV: &str = "FORGEPROBE_LOG_FORMAT";

/// Errors that can occur during logging initialization
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Invalid log level string provided
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Invalid log format string provided
    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    #[default]
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl LogLevel {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    /// Convert to an EnvFilter directive
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable colored output (default)
    #[default]
    Human,
    /// JSON structured output
    Json,
}

impl LogFormat {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" | "pretty" | "console" => Some(LogFormat::Human),
            "json" | "structured" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    /// Log level to use
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Create a new default logging configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build a configuration from the environment, erroring on unparseable values
    pub fn from_env() -> Result<Self, LoggingError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(LOG_LEVEL_ENV) {
            config.level =
                LogLevel::parse(&raw).ok_or(LoggingError::InvalidLogLevel(raw))?;
        }
        if let Ok(raw) = std::env::var(LOG_FORMAT_ENV) {
            config.format =
                LogFormat::parse(&raw).ok_or(LoggingError::InvalidLogFormat(raw))?;
        }
        Ok(config)
    }
}

/// Initialize logging with environment-driven defaults.
///
/// Unparseable environment values fall back to the defaults instead of
/// failing: the probes should never refuse to run because of a log setting.
/// Idempotent; only the first call installs a subscriber.
pub fn init_logging_default() {
    let config = LoggingConfig::from_env().unwrap_or_default();
    init_logging(config);
}

/// Initialize logging with an explicit configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set.
/// Idempotent; only the first call installs a subscriber.
pub fn init_logging(config: LoggingConfig) {
    TRACING_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter_str()));

        let result = match config.format {
            LogFormat::Human => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .try_init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init(),
        };

        // A subscriber installed by the embedding application wins.
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed, keeping it");
        }
    });
}
