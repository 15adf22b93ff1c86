mod host;
mod metrics;

pub use host::{AzureHost, HostInfo};
pub use metrics::{MemoryUsage, MetricsError, MetricsProvider, ProcessMetrics, ProcessSnapshot};
