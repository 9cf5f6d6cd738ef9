use super::exposition::Exposition;
use crate::config::{MetricSelectors, NodeConfig};
use crate::domain::errors::ReportError;
use crate::domain::metrics::NodeMetrics;
use crate::domain::ports::NodeMetricsSource;
use crate::infrastructure::core::HttpClientFactory;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Scrapes the node's Prometheus endpoint for the four snapshot values.
pub struct PrometheusNodeMetricsSource {
    client: Client,
    metrics_url: Url,
    selectors: MetricSelectors,
}

impl PrometheusNodeMetricsSource {
    pub fn new(config: &NodeConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: HttpClientFactory::create_client(timeout)?,
            metrics_url: config.metrics_url.clone(),
            selectors: config.selectors.clone(),
        })
    }

    async fn scrape(&self) -> Result<NodeMetrics> {
        let response = self
            .client
            .get(self.metrics_url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", self.metrics_url))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read node metrics body")?;
        if !status.is_success() {
            bail!("Node metrics endpoint {} returned {}", self.metrics_url, status);
        }

        let exposition = Exposition::parse(&text);
        debug!(
            "PrometheusNodeMetricsSource: {} samples ({} malformed) from {}",
            exposition.len(),
            exposition.malformed_lines(),
            self.metrics_url
        );

        snapshot_from(&exposition, &self.selectors)
    }
}

#[async_trait]
impl NodeMetricsSource for PrometheusNodeMetricsSource {
    async fn fetch(&self) -> Result<NodeMetrics, ReportError> {
        self.scrape().await.map_err(ReportError::MetricsUnavailable)
    }
}

/// Builds a snapshot from an exposition; series missing from the node stay absent.
pub fn snapshot_from(exposition: &Exposition, selectors: &MetricSelectors) -> Result<NodeMetrics> {
    let metrics = NodeMetrics::new(
        exposition.integer(&selectors.peer_count)?,
        exposition.integer(&selectors.best_block_height)?,
        exposition.integer(&selectors.finalized_block_height)?,
        exposition.integer(&selectors.ready_transaction_count)?,
    )?;
    Ok(metrics)
}
