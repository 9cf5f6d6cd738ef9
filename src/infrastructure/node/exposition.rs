//! Minimal reader for the Prometheus text exposition format.
//!
//! Only what the node source needs: sample name, labels and value. Comments,
//! type hints and timestamps are skipped. A line that fails to parse only
//! matters when a selector asks for its series.

use crate::config::MetricSelector;
use anyhow::{Result, anyhow, bail};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

impl Sample {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn matches(&self, selector: &MetricSelector) -> bool {
        if self.name != selector.name {
            return false;
        }
        match &selector.label {
            Some((key, value)) => self.label(key) == Some(value.as_str()),
            None => true,
        }
    }
}

/// Line that could not be read, keyed by the series name it appears to carry.
#[derive(Debug, Clone)]
struct Malformed {
    name: String,
    line: usize,
    reason: String,
}

/// Parsed exposition body
#[derive(Debug, Clone, Default)]
pub struct Exposition {
    samples: Vec<Sample>,
    malformed: Vec<Malformed>,
}

impl Exposition {
    pub fn parse(text: &str) -> Self {
        let mut exposition = Self::default();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Ok(sample) => exposition.samples.push(sample),
                Err(e) => {
                    debug!("Exposition: skipping line {}: {}", index + 1, e);
                    exposition.malformed.push(Malformed {
                        name: series_name(line).to_string(),
                        line: index + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
        exposition
    }

    /// Number of lines skipped because they could not be parsed.
    pub fn malformed_lines(&self) -> usize {
        self.malformed.len()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First sample matching `selector`.
    pub fn find(&self, selector: &MetricSelector) -> Option<&Sample> {
        self.samples.iter().find(|s| s.matches(selector))
    }

    /// Value of the selected series as a non-negative integer, `None` when absent.
    ///
    /// Fails when the series is present but unreadable, either because its
    /// value is not a count or because one of its lines is malformed.
    pub fn integer(&self, selector: &MetricSelector) -> Result<Option<u64>> {
        if let Some(sample) = self.find(selector) {
            return as_count(sample.value)
                .map(Some)
                .map_err(|e| anyhow!("{}: {}", selector, e));
        }
        match self.malformed.iter().find(|m| m.name == selector.name) {
            Some(bad) => bail!("{}: line {}: {}", selector, bad.line, bad.reason),
            None => Ok(None),
        }
    }
}

fn series_name(line: &str) -> &str {
    line.split(|c: char| c == '{' || c.is_whitespace())
        .next()
        .unwrap_or(line)
}

fn as_count(value: f64) -> Result<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        bail!("expected a non-negative integer, got {}", value);
    }
    Ok(value as u64)
}

fn parse_line(line: &str) -> Result<Sample> {
    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .ok_or_else(|| anyhow!("missing value"))?;
    let name = &line[..name_end];
    if name.is_empty() {
        bail!("missing metric name");
    }

    let (labels, rest) = if line[name_end..].starts_with('{') {
        parse_labels(&line[name_end + 1..])?
    } else {
        (Vec::new(), &line[name_end..])
    };

    let raw_value = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("missing value for {}", name))?;
    let value = parse_value(raw_value).ok_or_else(|| anyhow!("invalid value '{}'", raw_value))?;

    Ok(Sample {
        name: name.to_string(),
        labels,
        value,
    })
}

fn parse_value(raw: &str) -> Option<f64> {
    match raw {
        "+Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => raw.parse().ok(),
    }
}

/// Parses `key="value",...}` and returns the labels plus the text after `}`.
fn parse_labels(input: &str) -> Result<(Vec<(String, String)>, &str)> {
    let mut labels = Vec::new();
    let mut rest = input.trim_start();

    loop {
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }

        let eq = rest.find('=').ok_or_else(|| anyhow!("label without value"))?;
        let key = rest[..eq].trim().to_string();
        rest = rest[eq + 1..].trim_start();
        rest = rest
            .strip_prefix('"')
            .ok_or_else(|| anyhow!("label {} is not quoted", key))?;

        let mut value = String::new();
        let mut chars = rest.char_indices();
        let close = loop {
            match chars.next() {
                Some((i, '"')) => break i,
                Some((_, '\\')) => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, c)) => value.push(c),
                    None => bail!("unterminated label {}", key),
                },
                Some((_, c)) => value.push(c),
                None => bail!("unterminated label {}", key),
            }
        };
        labels.push((key, value));

        rest = rest[close + 1..].trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after.trim_start();
        } else if !rest.starts_with('}') {
            bail!("expected ',' or '}}' after label");
        }
    }
}
