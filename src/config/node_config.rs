//! Local node metrics endpoint configuration.
//!
//! Each snapshot field is read from one Prometheus series, picked by metric
//! name and an optional `label="value"` filter. Defaults match the series a
//! Substrate node exposes on its Prometheus port.

use super::{ConfigError, EnvLookup};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_NODE_METRICS_URL: &str = "http://localhost:9615/metrics";

/// Selects a single series from a Prometheus text exposition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct MetricSelector {
    pub name: String,
    pub label: Option<(String, String)>,
}

impl MetricSelector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            label: None,
        }
    }

    pub fn with_label(name: &str, key: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            label: Some((key.to_string(), value.to_string())),
        }
    }
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some((key, value)) => write!(f, "{}{{{}=\"{}\"}}", self.name, key, value),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for MetricSelector {
    type Err = String;

    /// Accepts `name` or `name{label="value"}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, label) = match s.split_once('{') {
            None => (s, None),
            Some((name, rest)) => {
                let inner = rest
                    .strip_suffix('}')
                    .ok_or_else(|| format!("unterminated label filter in '{}'", s))?;
                let (key, value) = inner
                    .split_once('=')
                    .ok_or_else(|| format!("label filter must be key=\"value\" in '{}'", s))?;
                let value = value.trim().trim_matches('"');
                (name, Some((key.trim().to_string(), value.to_string())))
            }
        };

        let valid_name = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
        if !valid_name {
            return Err(format!("invalid metric name in '{}'", s));
        }

        Ok(Self {
            name: name.to_string(),
            label,
        })
    }
}

impl TryFrom<String> for MetricSelector {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// `[node]` table of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeFileSection {
    pub metrics_url: Option<String>,
    pub peer_count: Option<MetricSelector>,
    pub best_block_height: Option<MetricSelector>,
    pub finalized_block_height: Option<MetricSelector>,
    pub ready_transaction_count: Option<MetricSelector>,
}

/// Series backing each snapshot field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSelectors {
    pub peer_count: MetricSelector,
    pub best_block_height: MetricSelector,
    pub finalized_block_height: MetricSelector,
    pub ready_transaction_count: MetricSelector,
}

impl Default for MetricSelectors {
    fn default() -> Self {
        Self {
            peer_count: MetricSelector::new("substrate_sub_libp2p_peers_count"),
            best_block_height: MetricSelector::with_label("substrate_block_height", "status", "best"),
            finalized_block_height: MetricSelector::with_label(
                "substrate_block_height",
                "status",
                "finalized",
            ),
            ready_transaction_count: MetricSelector::new("substrate_ready_transactions_number"),
        }
    }
}

/// Local node configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub metrics_url: Url,
    pub selectors: MetricSelectors,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            metrics_url: Url::parse(DEFAULT_NODE_METRICS_URL).expect("default node url is valid"),
            selectors: MetricSelectors::default(),
        }
    }
}

impl NodeConfig {
    pub fn resolve(file: &NodeFileSection, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let metrics_url = match env("NODE_METRICS_URL").or_else(|| file.metrics_url.clone()) {
            Some(raw) => Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                key: "NODE_METRICS_URL",
                reason: e.to_string(),
            })?,
            None => defaults.metrics_url,
        };

        let pick = |from_file: &Option<MetricSelector>, fallback: MetricSelector| {
            from_file.clone().unwrap_or(fallback)
        };
        let selectors = MetricSelectors {
            peer_count: pick(&file.peer_count, defaults.selectors.peer_count),
            best_block_height: pick(&file.best_block_height, defaults.selectors.best_block_height),
            finalized_block_height: pick(
                &file.finalized_block_height,
                defaults.selectors.finalized_block_height,
            ),
            ready_transaction_count: pick(
                &file.ready_transaction_count,
                defaults.selectors.ready_transaction_count,
            ),
        };

        Ok(Self {
            metrics_url,
            selectors,
        })
    }
}
