use thiserror::Error;

/// Failures of a single reporting cycle.
///
/// None of these are fatal: the reporter logs them, forwards them to the
/// error sink and tries again on the next tick.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Node metrics unavailable: {0:#}")]
    MetricsUnavailable(#[source] anyhow::Error),

    #[error("Failed to reach load balancer: {0:#}")]
    TransportError(#[source] anyhow::Error),

    #[error("Load balancer rejected metrics with status {status}: {body}")]
    RemoteRejected { status: u16, body: String },
}

impl ReportError {
    /// Short label for the cycle stage that failed, used in logs and counters.
    pub fn stage(&self) -> &'static str {
        match self {
            ReportError::MetricsUnavailable(_) => "fetch",
            ReportError::TransportError(_) | ReportError::RemoteRejected { .. } => "send",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ReportError::RemoteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
