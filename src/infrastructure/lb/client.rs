use crate::config::LoadBalancerConfig;
use crate::domain::errors::ReportError;
use crate::domain::metrics::NodeMetrics;
use crate::domain::ports::{LoadBalancerClient, TransportResult};
use crate::infrastructure::core::HttpClientFactory;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Resource holding "this node's current metrics", relative to the load balancer base URL.
pub const METRICS_PATH: &str = "api/v1/nodes/metrics";
/// Header carrying the node token issued by the load balancer.
pub const AUTH_HEADER: &str = "X-Auth-Header";

const MAX_ERROR_BODY_LEN: usize = 1024;

// ===== Load Balancer Client (REST API) =====

pub struct HttpLoadBalancerClient {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl HttpLoadBalancerClient {
    pub fn new(config: &LoadBalancerConfig) -> Result<Self> {
        let client = HttpClientFactory::create_client(config.request_timeout)?;
        let endpoint = metrics_endpoint(&config.base_url)?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl LoadBalancerClient for HttpLoadBalancerClient {
    async fn send(&self, metrics: &NodeMetrics) -> Result<TransportResult, ReportError> {
        let mut request = self.client.put(self.endpoint.clone()).json(metrics);
        if let Some(token) = &self.token {
            request = request.header(AUTH_HEADER, token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("PUT {}", self.endpoint))
            .map_err(ReportError::TransportError)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", self.endpoint))
            .map_err(ReportError::TransportError)?;

        debug!(
            "HttpLoadBalancerClient: PUT {} -> {} ({} bytes)",
            self.endpoint,
            status,
            body.len()
        );

        if !status.is_success() {
            return Err(ReportError::RemoteRejected {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        Ok(TransportResult {
            status: status.as_u16(),
            body,
        })
    }
}

/// Joins [`METRICS_PATH`] onto `base`, keeping any path prefix the base already has.
pub fn metrics_endpoint(base: &Url) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(METRICS_PATH)
        .with_context(|| format!("Invalid load balancer base URL: {}", base))
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut cut = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}
