// Node metrics reporting loop
pub mod metrics_reporter;

pub use metrics_reporter::{CycleResult, MetricsReporter};
