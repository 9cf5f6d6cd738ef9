use anyhow::{Context, Result, anyhow};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::application::monitoring::metrics_reporter::{CycleResult, MetricsReporter};
use crate::config::Settings;
use crate::domain::ports::{ErrorReporter, LoadBalancerClient, NodeMetricsSource};
use crate::infrastructure::lb::HttpLoadBalancerClient;
use crate::infrastructure::node::PrometheusNodeMetricsSource;
use crate::infrastructure::observability::{Metrics, flush_before_exit};

/// Handle to a running reporter task
pub struct SystemHandle {
    pub metrics: Metrics,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    errors: Arc<dyn ErrorReporter>,
}

impl SystemHandle {
    /// Ask the reporter to stop and wait for it. An in-flight cycle finishes
    /// first, then pending crash reports are flushed.
    pub async fn shutdown(self) -> Result<()> {
        // The receiver only disappears once the task has already exited.
        let _ = self.shutdown_tx.send(true);
        let joined = self.task.await;
        flush_before_exit(self.errors.as_ref());
        joined.context("Reporter task panicked")
    }

    /// Run until `signal` resolves, then shut down.
    ///
    /// The reporter loop never ends by itself, so a task that finishes before
    /// the signal is an error.
    pub async fn run_until<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let stopped = tokio::select! {
            res = signal => Stopped::Signal(res),
            joined = &mut self.task => Stopped::Task(joined),
        };

        match stopped {
            Stopped::Signal(signal_result) => {
                info!("Shutdown signal received. Waiting for in-flight cycle...");
                let shutdown = self.shutdown().await;
                signal_result.and(shutdown)
            }
            Stopped::Task(joined) => {
                error!("Reporter stopped before shutdown was requested");
                flush_before_exit(self.errors.as_ref());
                joined.context("Reporter task panicked")?;
                Err(anyhow!("Reporter stopped unexpectedly"))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

enum Stopped {
    Signal(Result<()>),
    Task(Result<(), JoinError>),
}

/// Wires the node source, the load balancer client and the reporter together.
pub struct Application {
    reporter: MetricsReporter,
    errors: Arc<dyn ErrorReporter>,
}

impl Application {
    /// Build the production wiring from resolved settings.
    pub fn build(settings: &Settings, errors: Arc<dyn ErrorReporter>) -> Result<Self> {
        let source = PrometheusNodeMetricsSource::new(&settings.node, settings.lb.request_timeout)
            .context("Failed to create node metrics source")?;
        let client = HttpLoadBalancerClient::new(&settings.lb)
            .context("Failed to create load balancer client")?;
        info!(
            "Reporting {} -> {} every {:?}",
            settings.node.metrics_url,
            client.endpoint(),
            settings.stats.interval
        );

        Self::with_components(settings, Arc::new(source), Arc::new(client), errors)
    }

    /// Same as [`Application::build`] with caller-supplied collaborators.
    pub fn with_components(
        settings: &Settings,
        source: Arc<dyn NodeMetricsSource>,
        client: Arc<dyn LoadBalancerClient>,
        errors: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        let metrics = Metrics::new().context("Failed to register reporter metrics")?;
        let reporter =
            MetricsReporter::new(source, client, errors.clone(), metrics, &settings.stats);
        Ok(Self { reporter, errors })
    }

    /// Run a single cycle in the foreground and flush its crash report, if any.
    pub async fn run_once(&self) -> CycleResult {
        let result = self.reporter.run_cycle().await;
        flush_before_exit(self.errors.as_ref());
        result
    }

    /// Spawn the reporting loop.
    pub fn start(self) -> SystemHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let metrics = self.reporter.metrics().clone();
        let task = tokio::spawn(self.reporter.run(shutdown_rx));

        SystemHandle {
            metrics,
            shutdown_tx,
            task,
            errors: self.errors,
        }
    }
}
