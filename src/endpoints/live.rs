// src/endpoints/live.rs
// If this answers at all, the process is alive.
use chrono::Utc;
use hyper::{Body, Response, StatusCode};
use serde::Serialize;

use super::{response, ProbeError, ProbeState};
use crate::probe::iso_timestamp;

#[derive(Serialize)]
struct LiveBody<'a> {
    status: &'static str,
    timestamp: String,
    pid: u32,
    uptime: u64,
    environment: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    azure: Option<AzureInstance<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AzureInstance<'a> {
    site_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<&'a str>,
}

pub fn get(state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    let body = LiveBody {
        status: "alive",
        timestamp: iso_timestamp(&Utc::now()),
        pid: std::process::id(),
        uptime: state.provider.uptime().as_secs(),
        environment: &state.host.environment,
        azure: state.host.azure.as_ref().map(|a| AzureInstance {
            site_name: &a.site_name,
            instance_id: a.instance_id.as_deref(),
            hostname: a.hostname.as_deref(),
        }),
    };

    response::json(StatusCode::OK, &body)
}

pub fn head(_state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    Ok(response::empty(StatusCode::OK))
}
