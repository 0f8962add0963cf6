//! Structured logging setup
//!
//! `RUST_LOG` overrides the configured level when it is set.

use crate::config::PlantCareConfig;
use crate::error::{PlantCareError, Result};
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging options taken from [`PlantCareConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl From<&PlantCareConfig> for LoggingConfig {
    fn from(config: &PlantCareConfig) -> Self {
        Self {
            log_level: config.log_level.clone(),
            json_logs: config.json_logs,
        }
    }
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    ///
    /// # Errors
    /// Returns a configuration error if the level is not a tracing level
    pub fn env_filter(&self) -> Result<EnvFilter> {
        let level = self
            .log_level
            .parse::<Level>()
            .map_err(|e| PlantCareError::configuration(format!("Invalid log level: {e}")))?;
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase())))
    }
}

/// Install the global tracing subscriber
///
/// # Errors
/// Returns a configuration error if the level is invalid or a global
/// subscriber is already installed
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json_logs {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        registry.with(json_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE);
        registry.with(fmt_layer).try_init()
    };
    installed.map_err(|e| {
        PlantCareError::configuration(format!("Failed to initialize tracing: {e}"))
    })?;

    info!("Tracing initialized with level: {}", config.log_level);
    Ok(())
}
