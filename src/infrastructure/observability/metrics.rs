//! Prometheus counters describing the daemon's own reporting activity
//!
//! All metrics use the `vedran_daemon_` prefix. They are never served over
//! HTTP; the reporter logs a summary after each cycle.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Reporting counters
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Completed cycles, successful or not
    pub cycles_total: IntCounter,
    /// Failed cycles by stage (`fetch` or `send`)
    pub cycle_failures_total: IntCounterVec,
    /// Unix time of the last snapshot accepted by the load balancer
    pub last_success_timestamp_seconds: IntGauge,
    /// Status code of the last load balancer response, 0 if none
    pub last_status_code: IntGauge,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles_total = IntCounter::with_opts(Opts::new(
            "vedran_daemon_cycles_total",
            "Completed reporting cycles",
        ))?;
        registry.register(Box::new(cycles_total.clone()))?;

        let cycle_failures_total = IntCounterVec::new(
            Opts::new(
                "vedran_daemon_cycle_failures_total",
                "Failed reporting cycles by stage",
            ),
            &["stage"],
        )?;
        registry.register(Box::new(cycle_failures_total.clone()))?;

        let last_success_timestamp_seconds = IntGauge::with_opts(Opts::new(
            "vedran_daemon_last_success_timestamp_seconds",
            "Unix time of the last accepted snapshot",
        ))?;
        registry.register(Box::new(last_success_timestamp_seconds.clone()))?;

        let last_status_code = IntGauge::with_opts(Opts::new(
            "vedran_daemon_last_status_code",
            "Status code of the last load balancer response",
        ))?;
        registry.register(Box::new(last_status_code.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            cycles_total,
            cycle_failures_total,
            last_success_timestamp_seconds,
            last_status_code,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_failure(&self, stage: &str) {
        self.cycle_failures_total.with_label_values(&[stage]).inc();
    }

    pub fn failures(&self, stage: &str) -> u64 {
        self.cycle_failures_total.with_label_values(&[stage]).get()
    }

    /// One-line summary for the per-cycle log entry
    pub fn summary(&self) -> String {
        format!(
            "cycles={} fetch_failures={} send_failures={} last_status={}",
            self.cycles_total.get(),
            self.failures("fetch"),
            self.failures("send"),
            self.last_status_code.get()
        )
    }
}
