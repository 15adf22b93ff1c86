// src/endpoints/ready.rs
use hyper::{Body, Response};
use serde::Serialize;
use std::borrow::Cow;

use super::{memory_gate, response, ProbeError, ProbeState};
use crate::probe::{
    serialize_iso, AllocationCheck, CheckResult, CheckStatus, MemoryCheck, OverallStatus,
    ProbeAggregator, ProbeReport,
};

#[derive(Serialize)]
struct ReadyBody<'a> {
    #[serde(serialize_with = "serialize_iso")]
    timestamp: chrono::DateTime<chrono::Utc>,
    ready: bool,
    checks: ReadyChecks<'a>,
}

#[derive(Serialize)]
struct ReadyChecks<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<Readiness<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory: Option<Readiness<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum ReadyStatus {
    Ready,
    NotReady,
}

#[derive(Serialize)]
struct Readiness<'a> {
    status: ReadyStatus,
    message: Cow<'a, str>,
}

impl<'a> Readiness<'a> {
    fn server(result: &'a CheckResult) -> Self {
        Self {
            status: ready_status(result),
            message: Cow::Borrowed(&result.detail),
        }
    }

    /// The memory check's own detail is only surfaced when it has no reading.
    fn memory(result: &'a CheckResult) -> Self {
        let status = ready_status(result);
        let percentage = result
            .details
            .as_ref()
            .and_then(|details| details.get("percentage"));
        let message = match (&status, percentage) {
            (ReadyStatus::Ready, _) => Cow::Borrowed("Memory usage within acceptable limits"),
            (ReadyStatus::NotReady, Some(pct)) => {
                Cow::Owned(format!("Memory usage too high: {}%", pct))
            }
            (ReadyStatus::NotReady, None) => Cow::Borrowed(result.detail.as_str()),
        };
        Self { status, message }
    }
}

fn ready_status(result: &CheckResult) -> ReadyStatus {
    match result.status {
        CheckStatus::Fail => ReadyStatus::NotReady,
        CheckStatus::Pass | CheckStatus::Warn => ReadyStatus::Ready,
    }
}

/// Ready unless memory is past the critical ratio or the allocator refuses a
/// small buffer.
pub fn evaluate(state: &ProbeState) -> ProbeReport {
    let server = AllocationCheck::default();
    let memory = MemoryCheck::critical(state.provider.as_ref(), &state.config.probes.memory);
    ProbeAggregator::default().evaluate(&[&server, &memory])
}

pub fn get(state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    let report = evaluate(state);
    state.observe(&report);

    let body = ReadyBody {
        timestamp: report.timestamp,
        ready: report.status != OverallStatus::Unhealthy,
        checks: ReadyChecks {
            server: report.checks.get("server").map(Readiness::server),
            memory: report.checks.get("memory").map(Readiness::memory),
        },
    };

    response::json(report.http_status, &body)
}

pub fn head(state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    Ok(response::empty(memory_gate(state).http_status))
}
