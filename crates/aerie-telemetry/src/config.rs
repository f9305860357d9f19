//! Telemetry configuration from environment variables.

use std::env;

use serde::{Deserialize, Serialize};

/// Process-level logging and metrics settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or a full directive)
    pub log_level: String,

    /// Whether to write logs to the console at all
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to register the Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "aerie".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AERIE_SERVICE_NAME`: Service name (default: aerie)
    /// - `AERIE_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `AERIE_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `AERIE_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `AERIE_METRICS`: Register Prometheus metrics (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("AERIE_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("AERIE_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("AERIE_CONSOLE_OUTPUT")
                .map(|v| is_truthy(&v))
                .unwrap_or(defaults.console_output),

            json_logs: lookup("AERIE_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(is_container),

            metrics_enabled: lookup("AERIE_METRICS")
                .map(|v| is_truthy(&v))
                .unwrap_or(defaults.metrics_enabled),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "false" && value != "0" && value != "off"
}
