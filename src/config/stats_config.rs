//! Reporting schedule configuration.

use super::{ConfigError, EnvLookup, env_parse};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 3600;
/// Upper bound on the interval: 30 days.
pub const MAX_STATS_INTERVAL_SECS: u64 = 30 * 24 * 3600;

/// `[stats]` table of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsFileSection {
    pub interval: Option<u64>,
    pub report_on_start: Option<bool>,
}

/// Reporting schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsConfig {
    /// Time between the start of consecutive cycles. Zero runs cycles back-to-back.
    pub interval: Duration,
    /// When true the first cycle runs immediately, otherwise one interval after start.
    pub report_on_start: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS),
            report_on_start: true,
        }
    }
}

impl StatsConfig {
    pub fn resolve(file: &StatsFileSection, env: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_secs = env_parse::<u64>(env, "STATS_INTERVAL")?
            .or(file.interval)
            .unwrap_or(defaults.interval.as_secs());
        if interval_secs > MAX_STATS_INTERVAL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "STATS_INTERVAL",
                reason: format!(
                    "{}s is above the maximum of {}s",
                    interval_secs, MAX_STATS_INTERVAL_SECS
                ),
            });
        }
        let report_on_start = env_parse::<bool>(env, "STATS_REPORT_ON_START")?
            .or(file.report_on_start)
            .unwrap_or(defaults.report_on_start);

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            report_on_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_stats_config_defaults() {
        let config = StatsConfig::resolve(&StatsFileSection::default(), &no_env).unwrap();
        assert_eq!(config.interval, Duration::from_secs(3600));
        assert!(config.report_on_start);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = StatsFileSection {
            interval: Some(60),
            report_on_start: Some(false),
        };
        let env = |key: &str| (key == "STATS_INTERVAL").then(|| "15".to_string());

        let config = StatsConfig::resolve(&file, &env).unwrap();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert!(!config.report_on_start);
    }

    #[test]
    fn test_rejects_negative_interval() {
        let env = |key: &str| (key == "STATS_INTERVAL").then(|| "-5".to_string());
        let err = StatsConfig::resolve(&StatsFileSection::default(), &env).unwrap_err();
        assert!(err.to_string().contains("STATS_INTERVAL"));
    }

    #[test]
    fn test_rejects_interval_above_maximum() {
        let env = |key: &str| match key {
            "STATS_INTERVAL" => Some(u64::MAX.to_string()),
            "STATS_REPORT_ON_START" => Some("false".to_string()),
            _ => None,
        };
        let err = StatsConfig::resolve(&StatsFileSection::default(), &env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "STATS_INTERVAL", .. }));

        let file = StatsFileSection {
            interval: Some(MAX_STATS_INTERVAL_SECS + 1),
            report_on_start: None,
        };
        assert!(StatsConfig::resolve(&file, &no_env).is_err());
    }

    #[test]
    fn test_accepts_maximum_interval() {
        let file = StatsFileSection {
            interval: Some(MAX_STATS_INTERVAL_SECS),
            report_on_start: Some(false),
        };
        let config = StatsConfig::resolve(&file, &no_env).unwrap();
        assert_eq!(config.interval, Duration::from_secs(MAX_STATS_INTERVAL_SECS));
    }
}
