use crate::domain::errors::ReportError;
use crate::domain::metrics::NodeMetrics;
use async_trait::async_trait;
use std::time::Duration;

/// Acknowledgement returned by the load balancer for an accepted snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResult {
    pub status: u16,
    pub body: String,
}

/// Reads the current health snapshot from the local node.
///
/// Implementations make a single attempt and fail with
/// [`ReportError::MetricsUnavailable`]; retrying is the reporter's job.
#[async_trait]
pub trait NodeMetricsSource: Send + Sync {
    async fn fetch(&self) -> Result<NodeMetrics, ReportError>;
}

/// Pushes a snapshot to the load balancer, replacing what it knows about this node.
///
/// Exactly one outbound request per call, no retry, no buffering.
#[async_trait]
pub trait LoadBalancerClient: Send + Sync {
    async fn send(&self, metrics: &NodeMetrics) -> Result<TransportResult, ReportError>;
}

/// Fire-and-forget sink for noteworthy failures (e.g. Sentry).
///
/// `report` must not block the reporting cycle.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &ReportError);

    /// Deliver anything still buffered. Returns false if the timeout elapsed first.
    fn flush(&self, timeout: Duration) -> bool;
}
