//! Configuration module for the daemon.
//!
//! Settings are resolved once at startup from, lowest to highest precedence:
//! built-in defaults, a TOML file (`config.toml`, or `config-{ENV}.toml` when
//! `ENV` is set) and environment variables (after `.env` has been loaded).
//! The resolved [`Settings`] value is then passed by reference to whoever
//! needs it.

mod lb_config;
mod node_config;
mod observability_config;
mod stats_config;

pub use lb_config::{DEFAULT_REQUEST_TIMEOUT_SECS, LoadBalancerConfig, LoadBalancerFileSection};
pub use node_config::{
    DEFAULT_NODE_METRICS_URL, MetricSelector, MetricSelectors, NodeConfig, NodeFileSection,
};
pub use observability_config::{
    DEFAULT_LOG_LEVEL, LogFileSection, ObservabilityConfig, SentryFileSection,
};
pub use stats_config::{DEFAULT_STATS_INTERVAL_SECS, StatsConfig, StatsFileSection};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable lookup, injected so tests never touch the process environment.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Startup configuration errors. Any of these prevents the reporter from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Missing load balancer endpoint: set lb.url in the config file or LB_URL")]
    MissingEndpoint,

    #[error("Invalid load balancer endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

/// Raw contents of the TOML config file. Every table and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub stats: StatsFileSection,
    pub lb: LoadBalancerFileSection,
    pub node: NodeFileSection,
    pub log: LogFileSection,
    pub sentry: SentryFileSection,
}

impl FileConfig {
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path`. A missing file yields defaults unless `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(path, &contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Fully resolved daemon settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub stats: StatsConfig,
    pub lb: LoadBalancerConfig,
    pub node: NodeConfig,
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Load settings from disk and the given environment lookup.
    ///
    /// `explicit_path` must exist when provided; otherwise the default file
    /// name for the current `ENV` is tried and silently skipped when absent.
    pub fn load(explicit_path: Option<&Path>, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let file = match explicit_path {
            Some(path) => FileConfig::load(path, true)?,
            None => {
                let name = config_file_name(env("ENV").as_deref());
                FileConfig::load(Path::new(&name), false)?
            }
        };

        Self::from_sources(&file, env)
    }

    /// Merge an already-parsed file with environment overrides.
    pub fn from_sources(file: &FileConfig, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            stats: StatsConfig::resolve(&file.stats, env)?,
            lb: LoadBalancerConfig::resolve(&file.lb, env)?,
            node: NodeConfig::resolve(&file.node, env)?,
            observability: ObservabilityConfig::resolve(&file.log, &file.sentry, env),
        })
    }
}

/// `config.toml`, or `config-{env}.toml` for a named environment.
pub fn config_file_name(env: Option<&str>) -> String {
    match env {
        Some(env) if !env.is_empty() => format!("config-{}.toml", env),
        _ => "config.toml".to_string(),
    }
}

pub(crate) fn env_parse<T>(env: EnvLookup<'_>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                reason: format!("'{}': {}", raw, e),
            }),
        None => Ok(None),
    }
}
