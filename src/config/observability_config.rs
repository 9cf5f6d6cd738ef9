//! Logging and crash-reporting configuration.

use super::EnvLookup;
use serde::Deserialize;

pub const DEFAULT_LOG_LEVEL: &str = "error";

/// `[log]` table of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFileSection {
    pub level: Option<String>,
}

/// `[sentry]` table of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentryFileSection {
    pub dsn: Option<String>,
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset
    pub log_level: String,
    /// Crash reporting is disabled when absent
    pub sentry_dsn: Option<String>,
    /// Deployment environment from `ENV`, also selects the config file
    pub environment: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            sentry_dsn: None,
            environment: None,
        }
    }
}

impl ObservabilityConfig {
    pub fn resolve(log: &LogFileSection, sentry: &SentryFileSection, env: EnvLookup<'_>) -> Self {
        Self {
            log_level: env("LOG_LEVEL")
                .or_else(|| log.level.clone())
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            sentry_dsn: env("SENTRY_DSN")
                .or_else(|| sentry.dsn.clone())
                .filter(|dsn| !dsn.trim().is_empty()),
            environment: env("ENV").filter(|e| !e.is_empty()),
        }
    }

    /// Crash reports are only shipped outside of the test environment.
    pub fn crash_reporting_enabled(&self) -> bool {
        self.sentry_dsn.is_some() && self.environment.as_deref() != Some("test")
    }
}
