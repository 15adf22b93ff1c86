// src/probe/aggregator.rs
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::check::{serialize_iso, Check, CheckError, CheckOutcome, CheckResult, CheckStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallStatus {
    /// Highest severity wins; no checks at all is healthy.
    pub fn from_worst(worst: Option<CheckStatus>) -> Self {
        match worst {
            Some(CheckStatus::Fail) => OverallStatus::Unhealthy,
            Some(CheckStatus::Warn) => OverallStatus::Degraded,
            Some(CheckStatus::Pass) | None => OverallStatus::Healthy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Healthy => "healthy",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Which HTTP status each overall status is served with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMapping {
    pub healthy: StatusCode,
    pub degraded: StatusCode,
    pub unhealthy: StatusCode,
}

impl StatusMapping {
    pub fn status_for(&self, status: OverallStatus) -> StatusCode {
        match status {
            OverallStatus::Healthy => self.healthy,
            OverallStatus::Degraded => self.degraded,
            OverallStatus::Unhealthy => self.unhealthy,
        }
    }
}

impl Default for StatusMapping {
    // degraded instances keep serving traffic
    fn default() -> Self {
        Self {
            healthy: StatusCode::OK,
            degraded: StatusCode::OK,
            unhealthy: StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Check results keyed by name, kept in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResults(Vec<CheckResult>);

impl CheckResults {
    /// Insert a result. A repeated name replaces the earlier entry in place.
    pub fn insert(&mut self, result: CheckResult) {
        match self.0.iter_mut().find(|r| r.name == result.name) {
            Some(existing) => *existing = result,
            None => self.0.push(result),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.0.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckResult> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn worst(&self) -> Option<CheckStatus> {
        self.0.iter().map(|r| r.status).max()
    }
}

impl Serialize for CheckResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in &self.0 {
            map.serialize_entry(&result.name, result)?;
        }
        map.end()
    }
}

/// Aggregate of every check run for one probe request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub status: OverallStatus,
    #[serde(serialize_with = "serialize_iso")]
    pub timestamp: DateTime<Utc>,
    pub checks: CheckResults,
    #[serde(skip)]
    pub http_status: StatusCode,
}

impl ProbeReport {
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|r| r.status == CheckStatus::Fail)
    }
}

/// Runs a list of independent checks and folds them into a [`ProbeReport`].
///
/// Evaluation is synchronous and touches no shared state. A check that
/// returns an error or panics becomes a `fail` result and the remaining
/// checks still run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeAggregator {
    mapping: StatusMapping,
}

impl ProbeAggregator {
    pub fn new(mapping: StatusMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> StatusMapping {
        self.mapping
    }

    pub fn evaluate(&self, checks: &[&dyn Check]) -> ProbeReport {
        let timestamp = Utc::now();
        let mut results = CheckResults::default();

        for check in checks {
            results.insert(run_check(*check));
        }

        let status = OverallStatus::from_worst(results.worst());
        ProbeReport {
            status,
            timestamp,
            checks: results,
            http_status: self.mapping.status_for(status),
        }
    }
}

/// Run one check, converting any internal failure into a `fail` result.
pub fn run_check(check: &dyn Check) -> CheckResult {
    let name = check.name();
    let outcome = match catch_unwind(AssertUnwindSafe(|| check.run())) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => failed(name, &err),
        Err(panic) => failed(name, &CheckError::Failed(panic_message(&*panic))),
    };
    CheckResult::from_outcome(name, outcome)
}

fn failed(name: &str, err: &CheckError) -> CheckOutcome {
    CheckOutcome::fail(format!("Failed to check {}: {}", name, err))
        .with_details(serde_json::json!({ "error": err.to_string() }))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("check panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("check panicked: {}", msg)
    } else {
        "check panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::check::check_fn;
    use crate::system::MetricsError;

    fn fixed(name: &'static str, status: CheckStatus) -> impl Check {
        check_fn(name, move || Ok(CheckOutcome::new(status, format!("{} is {:?}", name, status))))
    }

    #[test]
    fn all_pass_is_healthy() {
        let a = fixed("a", CheckStatus::Pass);
        let b = fixed("b", CheckStatus::Pass);
        let report = ProbeAggregator::default().evaluate(&[&a, &b]);

        assert_eq!(report.status, OverallStatus::Healthy);
        assert_eq!(report.http_status, StatusCode::OK);
        assert_eq!(report.checks.len(), 2);
    }

    #[test]
    fn any_warn_without_fail_is_degraded() {
        let a = fixed("a", CheckStatus::Pass);
        let b = fixed("b", CheckStatus::Warn);
        let c = fixed("c", CheckStatus::Pass);
        let report = ProbeAggregator::default().evaluate(&[&a, &b, &c]);

        assert_eq!(report.status, OverallStatus::Degraded);
        assert_eq!(report.http_status, StatusCode::OK);
    }

    #[test]
    fn any_fail_is_unhealthy() {
        let a = fixed("a", CheckStatus::Warn);
        let b = fixed("b", CheckStatus::Fail);
        let c = fixed("c", CheckStatus::Pass);
        let report = ProbeAggregator::default().evaluate(&[&a, &b, &c]);

        assert_eq!(report.status, OverallStatus::Unhealthy);
        assert_eq!(report.http_status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.failed_checks().count(), 1);
    }

    #[test]
    fn no_checks_is_healthy_and_empty() {
        let report = ProbeAggregator::default().evaluate(&[]);

        assert_eq!(report.status, OverallStatus::Healthy);
        assert!(report.checks.is_empty());
        assert_eq!(report.http_status, StatusCode::OK);
    }

    #[test]
    fn erroring_check_is_recorded_as_fail() {
        let broken = check_fn("memory", || {
            Err(MetricsError::Unsupported("plan9").into())
        });
        let after = fixed("uptime", CheckStatus::Pass);
        let report = ProbeAggregator::default().evaluate(&[&broken, &after]);

        let memory = report.checks.get("memory").unwrap();
        assert_eq!(memory.status, CheckStatus::Fail);
        assert!(memory.detail.contains("plan9"));
        assert_eq!(memory.details.as_ref().unwrap()["error"], "process metrics are not available on plan9");

        assert_eq!(report.checks.get("uptime").unwrap().status, CheckStatus::Pass);
        assert_eq!(report.status, OverallStatus::Unhealthy);
    }

    #[test]
    fn panicking_check_is_recorded_as_fail() {
        let boom = check_fn("boom", || -> Result<CheckOutcome, CheckError> { panic!("gauge missing") });
        let after = fixed("after", CheckStatus::Warn);
        let report = ProbeAggregator::default().evaluate(&[&boom, &after]);

        let result = report.checks.get("boom").unwrap();
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.detail.contains("gauge missing"));
        assert_eq!(report.checks.len(), 2);
    }

    #[test]
    fn checks_keep_supplied_order() {
        let z = fixed("zeta", CheckStatus::Pass);
        let a = fixed("alpha", CheckStatus::Pass);
        let m = fixed("mu", CheckStatus::Pass);
        let report = ProbeAggregator::default().evaluate(&[&z, &a, &m]);

        let names: Vec<_> = report.checks.names().collect();
        assert_eq!(names, ["zeta", "alpha", "mu"]);

        let json = serde_json::to_string(&report).unwrap();
        let zeta = json.find("\"zeta\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        let mu = json.find("\"mu\"").unwrap();
        assert!(zeta < alpha && alpha < mu);
    }

    #[test]
    fn repeated_name_replaces_in_place() {
        let first = fixed("memory", CheckStatus::Fail);
        let other = fixed("uptime", CheckStatus::Pass);
        let second = fixed("memory", CheckStatus::Pass);
        let report = ProbeAggregator::default().evaluate(&[&first, &other, &second]);

        let names: Vec<_> = report.checks.names().collect();
        assert_eq!(names, ["memory", "uptime"]);
        assert_eq!(report.status, OverallStatus::Healthy);
    }

    #[test]
    fn custom_mapping_is_applied() {
        let mapping = StatusMapping {
            degraded: StatusCode::TOO_MANY_REQUESTS,
            ..StatusMapping::default()
        };
        let warn = fixed("a", CheckStatus::Warn);
        let report = ProbeAggregator::new(mapping).evaluate(&[&warn]);

        assert_eq!(report.http_status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn report_serializes_without_http_status() {
        let a = fixed("a", CheckStatus::Pass);
        let json = serde_json::to_value(ProbeAggregator::default().evaluate(&[&a])).unwrap();

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"]["a"]["status"], "pass");
        assert!(json.get("http_status").is_none());
    }
}
