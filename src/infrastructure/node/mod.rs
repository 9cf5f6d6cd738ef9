pub mod exposition;
pub mod prometheus_source;

pub use exposition::{Exposition, Sample};
pub use prometheus_source::PrometheusNodeMetricsSource;
