//! In-memory stand-ins for the node, the load balancer and the error sink.

use crate::domain::errors::ReportError;
use crate::domain::metrics::NodeMetrics;
use crate::domain::ports::{ErrorReporter, LoadBalancerClient, NodeMetricsSource, TransportResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Scripted result for one call, consumed in order. The last entry repeats.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Ok(T),
    Unavailable(String),
    Transport(String),
    Rejected(u16, String),
}

impl<T: Clone> Scripted<T> {
    fn resolve(&self) -> Result<T, ReportError> {
        match self {
            Scripted::Ok(value) => Ok(value.clone()),
            Scripted::Unavailable(msg) => Err(ReportError::MetricsUnavailable(anyhow::anyhow!(
                msg.clone()
            ))),
            Scripted::Transport(msg) => {
                Err(ReportError::TransportError(anyhow::anyhow!(msg.clone())))
            }
            Scripted::Rejected(status, body) => Err(ReportError::RemoteRejected {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

struct Script<T> {
    steps: Mutex<VecDeque<Scripted<T>>>,
}

impl<T: Clone> Script<T> {
    fn new(steps: Vec<Scripted<T>>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
        }
    }

    fn next(&self) -> Result<T, ReportError> {
        let mut steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        let step = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        };
        match step {
            Some(step) => step.resolve(),
            None => Err(ReportError::MetricsUnavailable(anyhow::anyhow!(
                "mock has no scripted result"
            ))),
        }
    }
}

/// Call window recorded by the mocks, in tokio time.
#[derive(Debug, Clone, Copy)]
pub struct CallSpan {
    pub started: Instant,
    pub finished: Instant,
}

/// Shared log of every fetch and send, used to check cycles never overlap.
#[derive(Clone, Default)]
pub struct CallLog {
    spans: Arc<Mutex<Vec<(&'static str, CallSpan)>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&self) -> Instant {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Instant::now()
    }

    fn exit(&self, kind: &'static str, started: Instant) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let span = CallSpan {
            started,
            finished: Instant::now(),
        };
        self.spans
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((kind, span));
    }

    /// Highest number of fetch/send calls ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn spans(&self) -> Vec<(&'static str, CallSpan)> {
        self.spans.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.spans().iter().filter(|(k, _)| *k == kind).count()
    }
}

pub struct MockNodeMetricsSource {
    script: Script<NodeMetrics>,
    latency: Duration,
    log: CallLog,
}

impl MockNodeMetricsSource {
    pub fn new(steps: Vec<Scripted<NodeMetrics>>) -> Self {
        Self {
            script: Script::new(steps),
            latency: Duration::ZERO,
            log: CallLog::new(),
        }
    }

    pub fn returning(metrics: NodeMetrics) -> Self {
        Self::new(vec![Scripted::Ok(metrics)])
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(vec![Scripted::Unavailable(reason.to_string())])
    }

    /// Each fetch sleeps this long (tokio time) before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn calls(&self) -> usize {
        self.log.count("fetch")
    }
}

#[async_trait]
impl NodeMetricsSource for MockNodeMetricsSource {
    async fn fetch(&self) -> Result<NodeMetrics, ReportError> {
        let started = self.log.enter();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.script.next();
        self.log.exit("fetch", started);
        result
    }
}

pub struct MockLoadBalancerClient {
    script: Script<TransportResult>,
    latency: Duration,
    log: CallLog,
    sent: Mutex<Vec<NodeMetrics>>,
}

impl MockLoadBalancerClient {
    pub fn new(steps: Vec<Scripted<TransportResult>>) -> Self {
        Self {
            script: Script::new(steps),
            latency: Duration::ZERO,
            log: CallLog::new(),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Accepts everything with `200 {"status":"ok"}`.
    pub fn accepting() -> Self {
        Self::new(vec![Scripted::Ok(TransportResult {
            status: 200,
            body: r#"{"status":"ok"}"#.to_string(),
        })])
    }

    pub fn rejecting(status: u16, body: &str) -> Self {
        Self::new(vec![Scripted::Rejected(status, body.to_string())])
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn calls(&self) -> usize {
        self.log.count("send")
    }

    /// Snapshots received so far, in order.
    pub fn sent(&self) -> Vec<NodeMetrics> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LoadBalancerClient for MockLoadBalancerClient {
    async fn send(&self, metrics: &NodeMetrics) -> Result<TransportResult, ReportError> {
        let started = self.log.enter();
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*metrics);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.script.next();
        self.log.exit("send", started);
        result
    }
}

/// Keeps the display text of every reported error.
#[derive(Default)]
pub struct RecordingErrorReporter {
    reports: Mutex<Vec<String>>,
    flushes: AtomicUsize,
}

impl RecordingErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn report(&self, error: &ReportError) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(error.to_string());
    }

    fn flush(&self, _timeout: Duration) -> bool {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        true
    }
}
