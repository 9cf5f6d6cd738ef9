pub mod client;

pub use client::{AUTH_HEADER, HttpLoadBalancerClient, METRICS_PATH};
