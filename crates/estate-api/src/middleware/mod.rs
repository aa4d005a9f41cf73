//! Request pipeline layers that are not part of the domain.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
