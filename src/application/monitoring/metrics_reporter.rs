//! Periodic node metrics reporter
//!
//! Every interval: fetch a snapshot from the local node, PUT it to the load
//! balancer, log and forward any failure, go back to waiting. Cycles never
//! overlap and a failure never stops the loop; only the shutdown signal does.

use crate::config::StatsConfig;
use crate::domain::errors::ReportError;
use crate::domain::ports::{ErrorReporter, LoadBalancerClient, NodeMetricsSource, TransportResult};
use crate::infrastructure::observability::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Result of one fetch + send cycle
pub type CycleResult = Result<TransportResult, ReportError>;

/// Pushes node metrics to the load balancer on a fixed interval.
pub struct MetricsReporter {
    source: Arc<dyn NodeMetricsSource>,
    client: Arc<dyn LoadBalancerClient>,
    errors: Arc<dyn ErrorReporter>,
    metrics: Metrics,
    interval: Duration,
    report_on_start: bool,
}

impl MetricsReporter {
    /// Create a new metrics reporter
    ///
    /// # Arguments
    /// * `source` - Local node the snapshot is read from
    /// * `client` - Load balancer transport
    /// * `errors` - Side channel for failed cycles
    /// * `metrics` - Internal counters, updated after every cycle
    /// * `config` - Interval and first-cycle timing
    pub fn new(
        source: Arc<dyn NodeMetricsSource>,
        client: Arc<dyn LoadBalancerClient>,
        errors: Arc<dyn ErrorReporter>,
        metrics: Metrics,
        config: &StatsConfig,
    ) -> Self {
        Self {
            source,
            client,
            errors,
            metrics,
            interval: config.interval,
            report_on_start: config.report_on_start,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one cycle. Failures are logged and reported here, then handed back
    /// to the caller for inspection; they are never fatal.
    pub async fn run_cycle(&self) -> CycleResult {
        let result = self.fetch_and_send().await;
        self.metrics.cycles_total.inc();

        match &result {
            Ok(ack) => {
                self.metrics.last_status_code.set(i64::from(ack.status));
                self.metrics
                    .last_success_timestamp_seconds
                    .set(chrono::Utc::now().timestamp());
                info!("MetricsReporter: Metrics accepted by load balancer ({})", ack.status);
            }
            Err(e) => {
                if let Some(status) = e.status() {
                    self.metrics.last_status_code.set(i64::from(status));
                }
                self.metrics.inc_failure(e.stage());
                warn!("MetricsReporter: Cycle failed at {}: {}", e.stage(), e);
                self.errors.report(e);
            }
        }

        debug!("MetricsReporter: {}", self.metrics.summary());
        result
    }

    async fn fetch_and_send(&self) -> CycleResult {
        // Never send a cycle without a snapshot.
        let snapshot = self.source.fetch().await?;
        debug!("MetricsReporter: Fetched {:?}", snapshot);
        self.client.send(&snapshot).await
    }

    /// Run the reporter until `shutdown` becomes true.
    ///
    /// Shutdown is only observed between cycles: an in-flight cycle always
    /// completes. A dropped sender never stops the loop.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "MetricsReporter: Starting (interval: {:?}, first report {})",
            self.interval,
            if self.report_on_start {
                "immediately"
            } else {
                "after one interval"
            }
        );

        let mut ticker = Ticker::new(self.interval, self.report_on_start);
        loop {
            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            let _ = self.run_cycle().await;
        }

        info!(
            "MetricsReporter: Stopped ({})",
            self.metrics.summary()
        );
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Cycle trigger. A zero interval runs cycles back-to-back.
enum Ticker {
    Periodic(Interval),
    BackToBack,
    /// First tick lies beyond the clock's range, so no cycle ever comes due.
    Never,
}

impl Ticker {
    fn new(period: Duration, report_on_start: bool) -> Self {
        if period.is_zero() {
            return Ticker::BackToBack;
        }

        let now = Instant::now();
        let start = if report_on_start {
            now
        } else {
            match now.checked_add(period) {
                Some(start) => start,
                None => {
                    warn!(
                        "MetricsReporter: Interval {:?} is out of range, no cycle will run",
                        period
                    );
                    return Ticker::Never;
                }
            }
        };
        let mut interval = tokio::time::interval_at(start, period);
        // A late cycle is followed immediately by the next one, then the period restarts.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ticker::Periodic(interval)
    }

    async fn tick(&mut self) {
        match self {
            Ticker::Periodic(interval) => {
                interval.tick().await;
            }
            Ticker::BackToBack => tokio::task::yield_now().await,
            Ticker::Never => std::future::pending::<()>().await,
        }
    }
}
