// src/probe/checks.rs
// Built-in checks. Each is a small value constructed per request.
use serde_json::json;
use std::time::{Duration, Instant};

use super::check::{Check, CheckError, CheckOutcome, CheckStatus};
use crate::config::{LatencyThresholds, MemoryThresholds};
use crate::system::{AzureHost, MetricsProvider};

/// Grade a `used / limit` ratio. Boundaries are exclusive: a ratio equal to
/// `fail` is only a warning.
pub fn classify_memory(ratio: f64, warn: f64, fail: f64) -> CheckStatus {
    if ratio > fail {
        CheckStatus::Fail
    } else if ratio > warn {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    }
}

pub fn classify_latency(elapsed: Duration, thresholds: &LatencyThresholds) -> CheckStatus {
    if elapsed > thresholds.fail() {
        CheckStatus::Fail
    } else if elapsed > thresholds.warn() {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    }
}

/// Compact run time, e.g. `1d 2h 5s`. Zero components are dropped.
pub fn format_uptime(total_secs: u64) -> String {
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }
    parts.join(" ")
}

pub struct MemoryCheck<'a> {
    provider: &'a dyn MetricsProvider,
    warn_ratio: f64,
    fail_ratio: f64,
}

impl<'a> MemoryCheck<'a> {
    /// Grades against the warn and fail ratios.
    pub fn detailed(provider: &'a dyn MetricsProvider, thresholds: &MemoryThresholds) -> Self {
        Self {
            provider,
            warn_ratio: thresholds.warn_ratio,
            fail_ratio: thresholds.fail_ratio,
        }
    }

    /// Only fails, and only past the critical ratio.
    pub fn critical(provider: &'a dyn MetricsProvider, thresholds: &MemoryThresholds) -> Self {
        Self {
            provider,
            warn_ratio: thresholds.critical_ratio,
            fail_ratio: thresholds.critical_ratio,
        }
    }
}

impl Check for MemoryCheck<'_> {
    fn name(&self) -> &str {
        "memory"
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        let memory = self.provider.snapshot()?.memory;
        let status = classify_memory(memory.ratio(), self.warn_ratio, self.fail_ratio);

        Ok(CheckOutcome::new(
            status,
            format!(
                "Memory usage: {}MB / {}MB ({}%)",
                memory.used_mb(),
                memory.limit_mb(),
                memory.percent()
            ),
        )
        .with_details(json!({
            "used": memory.used_mb(),
            "total": memory.limit_mb(),
            "percentage": memory.percent(),
            "virtual": memory.virtual_mb(),
        })))
    }
}

pub struct UptimeCheck<'a> {
    provider: &'a dyn MetricsProvider,
}

impl<'a> UptimeCheck<'a> {
    pub fn new(provider: &'a dyn MetricsProvider) -> Self {
        Self { provider }
    }
}

impl Check for UptimeCheck<'_> {
    fn name(&self) -> &str {
        "uptime"
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        let secs = self.provider.uptime().as_secs();
        Ok(CheckOutcome::pass(format!("Process uptime: {} seconds", secs))
            .with_details(json!({ "seconds": secs, "formatted": format_uptime(secs) })))
    }
}

/// Reports the App Service metadata. Only added when running on Azure.
pub struct AzureCheck<'a> {
    host: &'a AzureHost,
}

impl<'a> AzureCheck<'a> {
    pub fn new(host: &'a AzureHost) -> Self {
        Self { host }
    }
}

impl Check for AzureCheck<'_> {
    fn name(&self) -> &str {
        "azure"
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        Ok(CheckOutcome::pass("Running on Azure App Service")
            .with_details(serde_json::to_value(self.host)?))
    }
}

/// Time spent evaluating the checks that ran before this one.
pub struct ResponseTimeCheck {
    started: Instant,
    thresholds: LatencyThresholds,
}

impl ResponseTimeCheck {
    pub fn new(started: Instant, thresholds: LatencyThresholds) -> Self {
        Self { started, thresholds }
    }
}

impl Check for ResponseTimeCheck {
    fn name(&self) -> &str {
        "responseTime"
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        let elapsed = self.started.elapsed();
        let millis = elapsed.as_millis() as u64;
        Ok(CheckOutcome::new(
            classify_latency(elapsed, &self.thresholds),
            format!("Response time: {}ms", millis),
        )
        .with_details(json!({ "milliseconds": millis })))
    }
}

/// Confirms the allocator still hands out a small buffer.
pub struct AllocationCheck {
    bytes: usize,
}

impl AllocationCheck {
    pub fn new(bytes: usize) -> Self {
        Self { bytes }
    }
}

impl Default for AllocationCheck {
    fn default() -> Self {
        Self::new(8 * 1024)
    }
}

impl Check for AllocationCheck {
    fn name(&self) -> &str {
        "server"
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        let mut buf: Vec<u8> = Vec::new();
        if buf.try_reserve_exact(self.bytes).is_err() {
            return Ok(CheckOutcome::fail(
                "Cannot allocate memory for basic operations",
            ));
        }
        buf.resize(self.bytes, 0);
        Ok(CheckOutcome::pass("Server is running"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{MemoryUsage, MetricsError, ProcessSnapshot};

    struct FixedMetrics {
        ratio: f64,
    }

    impl MetricsProvider for FixedMetrics {
        fn snapshot(&self) -> Result<ProcessSnapshot, MetricsError> {
            let limit_bytes = 1_000 * 1024 * 1024;
            Ok(ProcessSnapshot {
                pid: 42,
                uptime: self.uptime(),
                memory: MemoryUsage {
                    used_bytes: (limit_bytes as f64 * self.ratio) as u64,
                    limit_bytes,
                    virtual_bytes: 2 * limit_bytes,
                },
            })
        }

        fn uptime(&self) -> Duration {
            Duration::from_secs(3_725)
        }
    }

    struct NoMetrics;

    impl MetricsProvider for NoMetrics {
        fn snapshot(&self) -> Result<ProcessSnapshot, MetricsError> {
            Err(MetricsError::Unsupported("test"))
        }

        fn uptime(&self) -> Duration {
            Duration::ZERO
        }
    }

    #[test]
    fn memory_thresholds() {
        assert_eq!(classify_memory(0.95, 0.70, 0.90), CheckStatus::Fail);
        assert_eq!(classify_memory(0.75, 0.70, 0.90), CheckStatus::Warn);
        assert_eq!(classify_memory(0.50, 0.70, 0.90), CheckStatus::Pass);
    }

    #[test]
    fn memory_boundaries_are_exclusive() {
        assert_eq!(classify_memory(0.70, 0.70, 0.90), CheckStatus::Pass);
        assert_eq!(classify_memory(0.90, 0.70, 0.90), CheckStatus::Warn);
    }

    #[test]
    fn latency_thresholds() {
        let t = LatencyThresholds::default();
        assert_eq!(classify_latency(Duration::from_millis(1001), &t), CheckStatus::Fail);
        assert_eq!(classify_latency(Duration::from_millis(1000), &t), CheckStatus::Warn);
        assert_eq!(classify_latency(Duration::from_millis(501), &t), CheckStatus::Warn);
        assert_eq!(classify_latency(Duration::from_millis(500), &t), CheckStatus::Pass);
        assert_eq!(classify_latency(Duration::ZERO, &t), CheckStatus::Pass);
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(0), "0s");
        assert_eq!(format_uptime(59), "59s");
        assert_eq!(format_uptime(60), "1m");
        assert_eq!(format_uptime(3_725), "1h 2m 5s");
        assert_eq!(format_uptime(90_000), "1d 1h");
    }

    #[test]
    fn memory_check_reports_usage() {
        let metrics = FixedMetrics { ratio: 0.75 };
        let outcome = MemoryCheck::detailed(&metrics, &MemoryThresholds::default())
            .run()
            .unwrap();

        assert_eq!(outcome.status, CheckStatus::Warn);
        assert_eq!(outcome.detail, "Memory usage: 750MB / 1000MB (75%)");
        let details = outcome.details.unwrap();
        assert_eq!(details["percentage"], 75);
        assert_eq!(details["total"], 1000);
    }

    #[test]
    fn critical_memory_check_never_warns() {
        let thresholds = MemoryThresholds::default();

        let busy = FixedMetrics { ratio: 0.93 };
        let outcome = MemoryCheck::critical(&busy, &thresholds).run().unwrap();
        assert_eq!(outcome.status, CheckStatus::Pass);

        let full = FixedMetrics { ratio: 0.97 };
        let outcome = MemoryCheck::critical(&full, &thresholds).run().unwrap();
        assert_eq!(outcome.status, CheckStatus::Fail);
    }

    #[test]
    fn memory_check_propagates_provider_errors() {
        let err = MemoryCheck::detailed(&NoMetrics, &MemoryThresholds::default())
            .run()
            .unwrap_err();
        assert!(matches!(err, CheckError::Metrics(MetricsError::Unsupported("test"))));
    }

    #[test]
    fn uptime_check_always_passes() {
        let outcome = UptimeCheck::new(&FixedMetrics { ratio: 0.0 }).run().unwrap();
        assert_eq!(outcome.status, CheckStatus::Pass);
        assert_eq!(outcome.detail, "Process uptime: 3725 seconds");
        assert_eq!(outcome.details.unwrap()["formatted"], "1h 2m 5s");
    }

    #[test]
    fn response_time_check_grades_elapsed() {
        let fresh = ResponseTimeCheck::new(Instant::now(), LatencyThresholds::default());
        assert_eq!(fresh.run().unwrap().status, CheckStatus::Pass);

        let tight = LatencyThresholds { warn_ms: 0, fail_ms: 1 };
        let started = Instant::now() - Duration::from_millis(50);
        let slow = ResponseTimeCheck::new(started, tight);
        let outcome = slow.run().unwrap();
        assert_eq!(outcome.status, CheckStatus::Fail);
        assert!(outcome.detail.starts_with("Response time: "));
    }

    #[test]
    fn allocation_check_passes() {
        let outcome = AllocationCheck::default().run().unwrap();
        assert_eq!(outcome.status, CheckStatus::Pass);
    }

    #[test]
    fn oversized_allocation_fails() {
        let outcome = AllocationCheck::new(usize::MAX).run().unwrap();
        assert_eq!(outcome.status, CheckStatus::Fail);
    }
}
