pub mod core;
pub mod lb;
pub mod mock;
pub mod node;
pub mod observability;

pub use lb::HttpLoadBalancerClient;
pub use node::PrometheusNodeMetricsSource;
