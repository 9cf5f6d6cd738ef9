//! Load balancer endpoint and credentials.

use super::{ConfigError, EnvLookup, env_parse};
use reqwest::header::HeaderValue;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// `[lb]` table of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadBalancerFileSection {
    pub url: Option<String>,
    pub token: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Resolved load balancer target
#[derive(Clone, PartialEq, Eq)]
pub struct LoadBalancerConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub request_timeout: Duration,
}

// Keeps the token out of logs.
impl std::fmt::Debug for LoadBalancerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadBalancerConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl LoadBalancerConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_endpoint(base_url)?,
            token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    pub fn resolve(file: &LoadBalancerFileSection, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let raw_url = env("LB_URL")
            .or_else(|| file.url.clone())
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;

        let token = env("LB_TOKEN")
            .or_else(|| file.token.clone())
            .filter(|token| !token.is_empty());
        if let Some(token) = &token {
            // Sent verbatim as a header on every cycle.
            HeaderValue::from_str(token).map_err(|_| ConfigError::InvalidValue {
                key: "LB_TOKEN",
                reason: "token must be visible ASCII without control characters".to_string(),
            })?;
        }

        let timeout_secs = env_parse::<u64>(env, "LB_REQUEST_TIMEOUT_SECS")?
            .or(file.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LB_REQUEST_TIMEOUT_SECS",
                reason: "request timeout must be at least one second".to_string(),
            });
        }

        Ok(Self {
            base_url: parse_endpoint(raw_url.trim())?,
            token,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEndpoint {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidEndpoint {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_endpoint_is_fatal() {
        let err = LoadBalancerConfig::resolve(&LoadBalancerFileSection::default(), &no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEndpoint));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let file = LoadBalancerFileSection {
            url: Some("ftp://lb.example.com".to_string()),
            ..Default::default()
        };
        let err = LoadBalancerConfig::resolve(&file, &no_env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_rejects_garbage_endpoint() {
        let env = |key: &str| (key == "LB_URL").then(|| "not a url".to_string());
        let err = LoadBalancerConfig::resolve(&LoadBalancerFileSection::default(), &env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_env_overrides_file_endpoint_and_token() {
        let file = LoadBalancerFileSection {
            url: Some("http://file.example.com".to_string()),
            token: Some("file-token".to_string()),
            request_timeout_secs: Some(5),
        };
        let env = |key: &str| match key {
            "LB_URL" => Some("https://env.example.com:8443".to_string()),
            "LB_TOKEN" => Some("env-token".to_string()),
            _ => None,
        };

        let config = LoadBalancerConfig::resolve(&file, &env).unwrap();
        assert_eq!(config.base_url.host_str(), Some("env.example.com"));
        assert_eq!(config.base_url.port(), Some(8443));
        assert_eq!(config.token.as_deref(), Some("env-token"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_token_unusable_as_header() {
        let file = LoadBalancerFileSection {
            url: Some("http://lb.local".to_string()),
            token: Some("abc\r\nX-Injected: 1".to_string()),
            ..Default::default()
        };
        let err = LoadBalancerConfig::resolve(&file, &no_env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "LB_TOKEN", .. }));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = LoadBalancerConfig::new("http://lb.local").unwrap();
        config.token = Some("super-secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
