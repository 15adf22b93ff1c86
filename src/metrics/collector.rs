// src/metrics/collector.rs
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

use crate::probe::{CheckStatus, OverallStatus, ProbeReport};

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Request metrics
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,

    // Probe outcome metrics
    pub check_status: IntGaugeVec,
    pub overall_status: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("probe_requests_total", "Total number of probe requests"),
            &["endpoint", "method", "status_code"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "probe_request_duration_seconds",
                "Probe request duration in seconds",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let check_status = IntGaugeVec::new(
            Opts::new(
                "probe_check_status",
                "Last result of each check (0=pass, 1=warn, 2=fail)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_status.clone()))?;

        let overall_status = IntGauge::new(
            "probe_overall_status",
            "Last overall status (0=healthy, 1=degraded, 2=unhealthy)",
        )?;
        registry.register(Box::new(overall_status.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            check_status,
            overall_status,
        })
    }

    pub fn record_request(
        &self,
        endpoint: &str,
        method: &str,
        status_code: u16,
        duration: std::time::Duration,
    ) {
        let status = status_code.to_string();
        self.requests_total
            .with_label_values(&[endpoint, method, &status])
            .inc();

        self.request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration.as_secs_f64());
    }

    pub fn record_report(&self, report: &ProbeReport) {
        for check in report.checks.iter() {
            let value = match check.status {
                CheckStatus::Pass => 0,
                CheckStatus::Warn => 1,
                CheckStatus::Fail => 2,
            };
            self.check_status
                .with_label_values(&[check.name.as_str()])
                .set(value);
        }

        let value = match report.status {
            OverallStatus::Healthy => 0,
            OverallStatus::Degraded => 1,
            OverallStatus::Unhealthy => 2,
        };
        self.overall_status.set(value);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{check_fn, CheckOutcome, ProbeAggregator};
    use std::time::Duration;

    #[test]
    fn request_metrics_are_exposed() {
        let registry = MetricsRegistry::new().unwrap();
        let collector = registry.collector();

        collector.record_request("healthz", "GET", 200, Duration::from_millis(3));
        collector.record_request("healthz", "GET", 200, Duration::from_millis(4));

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains(
            r#"probe_requests_total{endpoint="healthz",method="GET",status_code="200"} 2"#
        ));
        assert!(text.contains("probe_request_duration_seconds_bucket"));
    }

    #[test]
    fn report_statuses_become_gauges() {
        let registry = MetricsRegistry::new().unwrap();
        let collector = registry.collector();

        let ok = check_fn("uptime", || Ok(CheckOutcome::pass("up")));
        let hot = check_fn("memory", || Ok(CheckOutcome::warn("hot")));
        let report = ProbeAggregator::default().evaluate(&[&ok, &hot]);
        collector.record_report(&report);

        assert_eq!(collector.check_status.with_label_values(&["uptime"]).get(), 0);
        assert_eq!(collector.check_status.with_label_values(&["memory"]).get(), 1);
        assert_eq!(collector.overall_status.get(), 1);
    }
}
