mod collector;
mod server;

pub use collector::{MetricsCollector, MetricsRegistry, Timer};
pub use server::{metrics_response, start_metrics_server};
