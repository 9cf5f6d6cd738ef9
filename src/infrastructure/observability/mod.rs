//! Push-based observability for the daemon
//!
//! Outbound only, nothing listens for requests:
//!
//! 1. **Structured logs** via `tracing`
//! 2. **Internal counters** in a Prometheus registry, summarised in the logs
//! 3. **Crash reporting** to Sentry when a DSN is configured

pub mod crash_reporting;
pub mod metrics;

pub use crash_reporting::{
    NoopErrorReporter, SHUTDOWN_FLUSH_TIMEOUT, SentryErrorReporter, error_reporter_from,
    flush_before_exit,
};
pub use metrics::Metrics;
