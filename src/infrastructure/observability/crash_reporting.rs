//! Crash/error reporting side channel.
//!
//! Reports are handed to Sentry's background transport and never awaited by
//! the reporting loop. Whatever is still queued is flushed once at shutdown.

use crate::config::ObservabilityConfig;
use crate::domain::errors::ReportError;
use crate::domain::ports::ErrorReporter;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Flush budget used by the binary before exiting.
pub const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Sentry-backed reporter. Dropping it also flushes and shuts the client down.
pub struct SentryErrorReporter {
    guard: sentry::ClientInitGuard,
}

impl SentryErrorReporter {
    pub fn init(dsn: &str, environment: Option<&str>) -> Result<Self> {
        let dsn: sentry::types::Dsn = dsn.parse().context("Invalid SENTRY_DSN")?;
        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            release: sentry::release_name!(),
            environment: environment.map(|env| Cow::Owned(env.to_string())),
            ..Default::default()
        });
        Ok(Self { guard })
    }
}

impl ErrorReporter for SentryErrorReporter {
    fn report(&self, error: &ReportError) {
        sentry::with_scope(
            |scope| {
                scope.set_tag("stage", error.stage());
                if let Some(status) = error.status() {
                    scope.set_tag("status", status);
                }
            },
            || sentry::capture_error(error),
        );
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.guard.flush(Some(timeout))
    }
}

/// Flushes queued reports before the process exits.
pub fn flush_before_exit(errors: &dyn ErrorReporter) {
    if !errors.flush(SHUTDOWN_FLUSH_TIMEOUT) {
        error!("Crash reports still pending after {:?}", SHUTDOWN_FLUSH_TIMEOUT);
    }
}

/// Used when crash reporting is off; failures still reach the logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopErrorReporter;

impl ErrorReporter for NoopErrorReporter {
    fn report(&self, _error: &ReportError) {}

    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Picks the reporter for this process from the resolved settings.
pub fn error_reporter_from(config: &ObservabilityConfig) -> Result<Arc<dyn ErrorReporter>> {
    match (&config.sentry_dsn, config.crash_reporting_enabled()) {
        (Some(dsn), true) => {
            let reporter = SentryErrorReporter::init(dsn, config.environment.as_deref())?;
            info!("Crash reporting enabled (Sentry)");
            Ok(Arc::new(reporter))
        }
        _ => {
            info!("Crash reporting disabled");
            Ok(Arc::new(NoopErrorReporter))
        }
    }
}
