// src/probe/check.rs
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::system::MetricsError;

/// Severity of a single check. Ordered so the worst result is the max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
        }
    }
}

/// What a check reports before the aggregator stamps it with a name and time.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub detail: String,
    pub details: Option<Value>,
}

impl CheckOutcome {
    pub fn new(status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            details: None,
        }
    }

    pub fn pass(detail: impl Into<String>) -> Self {
        Self::new(CheckStatus::Pass, detail)
    }

    pub fn warn(detail: impl Into<String>) -> Self {
        Self::new(CheckStatus::Warn, detail)
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self::new(CheckStatus::Fail, detail)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// One named diagnostic outcome, as serialized into probe reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    #[serde(skip)]
    pub name: String,
    pub status: CheckStatus,
    #[serde(rename = "time", serialize_with = "serialize_iso")]
    pub measured_at: DateTime<Utc>,
    #[serde(rename = "output")]
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl CheckResult {
    pub fn from_outcome(name: impl Into<String>, outcome: CheckOutcome) -> Self {
        Self {
            name: name.into(),
            status: outcome.status,
            measured_at: Utc::now(),
            detail: outcome.detail,
            details: outcome.details,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("failed to encode check details: {0}")]
    Details(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

/// A zero-argument, independent diagnostic.
///
/// Implementations must not depend on other checks' results. Returning `Err`
/// (or panicking) is allowed: the aggregator records it as a `fail`.
pub trait Check {
    fn name(&self) -> &str;

    fn run(&self) -> Result<CheckOutcome, CheckError>;
}

/// Adapts a closure into a [`Check`].
pub struct FnCheck<F> {
    name: String,
    f: F,
}

pub fn check_fn<F>(name: impl Into<String>, f: F) -> FnCheck<F>
where
    F: Fn() -> Result<CheckOutcome, CheckError>,
{
    FnCheck {
        name: name.into(),
        f,
    }
}

impl<F> Check for FnCheck<F>
where
    F: Fn() -> Result<CheckOutcome, CheckError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<CheckOutcome, CheckError> {
        (self.f)()
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.123Z`.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn serialize_iso<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&iso_timestamp(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn severity_order() {
        assert!(CheckStatus::Fail > CheckStatus::Warn);
        assert!(CheckStatus::Warn > CheckStatus::Pass);
    }

    #[test]
    fn result_wire_format() {
        let mut result = CheckResult::from_outcome(
            "memory",
            CheckOutcome::warn("Memory usage: 75MB / 100MB (75%)")
                .with_details(serde_json::json!({ "percentage": 75 })),
        );
        result.measured_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "warn",
                "time": "2024-05-01T12:00:00.000Z",
                "output": "Memory usage: 75MB / 100MB (75%)",
                "details": { "percentage": 75 },
            })
        );
    }

    #[test]
    fn closures_are_checks() {
        let check = check_fn("static", || Ok(CheckOutcome::pass("fine")));
        assert_eq!(check.name(), "static");
        assert_eq!(check.run().unwrap().status, CheckStatus::Pass);
    }
}
