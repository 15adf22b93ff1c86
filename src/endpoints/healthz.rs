// src/endpoints/healthz.rs
use hyper::{Body, Response};
use serde::Serialize;
use std::time::Instant;

use super::{memory_gate, response, ProbeError, ProbeState};
use crate::probe::{
    AzureCheck, Check, MemoryCheck, ProbeAggregator, ProbeReport, ResponseTimeCheck, UptimeCheck,
};

#[derive(Serialize)]
struct HealthzBody<'a> {
    #[serde(flatten)]
    report: &'a ProbeReport,
    info: Info<'a>,
}

#[derive(Serialize)]
struct Info<'a> {
    version: &'a str,
    environment: &'a str,
    uptime: u64,
    pid: u32,
    platform: &'static str,
    architecture: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    azure: Option<AzureSummary<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AzureSummary<'a> {
    site_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<&'a str>,
    slot: &'a str,
}

/// Full report: memory, uptime, the Azure host when present, and the time
/// spent producing all of it.
pub fn evaluate(state: &ProbeState) -> ProbeReport {
    let started = Instant::now();
    let thresholds = &state.config.probes;

    let memory = MemoryCheck::detailed(state.provider.as_ref(), &thresholds.memory);
    let uptime = UptimeCheck::new(state.provider.as_ref());
    let azure = state.host.azure.as_ref().map(AzureCheck::new);
    let response_time = ResponseTimeCheck::new(started, thresholds.latency);

    let mut checks: Vec<&dyn Check> = vec![&memory, &uptime];
    if let Some(azure) = &azure {
        checks.push(azure);
    }
    // runs last so it measures everything before it
    checks.push(&response_time);

    ProbeAggregator::default().evaluate(&checks)
}

pub fn get(state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    let report = evaluate(state);
    state.observe(&report);

    let body = HealthzBody {
        report: &report,
        info: Info {
            version: &state.host.version,
            environment: &state.host.environment,
            uptime: state.provider.uptime().as_secs(),
            pid: std::process::id(),
            platform: state.host.platform,
            architecture: state.host.architecture,
            azure: state.host.azure.as_ref().map(|a| AzureSummary {
                site_name: &a.site_name,
                hostname: a.hostname.as_deref(),
                slot: &a.slot,
            }),
        },
    };

    response::json(report.http_status, &body)
}

pub fn head(state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    Ok(response::empty(memory_gate(state).http_status))
}
