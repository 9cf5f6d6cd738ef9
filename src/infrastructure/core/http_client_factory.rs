use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates an HTTP client for single-shot requests.
    ///
    /// No retry middleware: every call is exactly one request, retries are
    /// driven by the reporting interval. `timeout` bounds the whole request so
    /// a stuck peer cannot stall the reporting loop.
    pub fn create_client(timeout: Duration) -> Result<Client> {
        Client::builder()
            .pool_max_idle_per_host(1)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")
    }
}
