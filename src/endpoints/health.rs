// src/endpoints/health.rs
// Basic load balancer health: static facts plus a memory reading.
use chrono::Utc;
use hyper::{Body, Response, StatusCode};
use serde::Serialize;

use super::{response, ProbeError, ProbeState};
use crate::probe::iso_timestamp;

#[derive(Serialize)]
struct HealthBody<'a> {
    status: &'static str,
    timestamp: String,
    uptime: f64,
    environment: &'a str,
    version: &'a str,
    hostname: &'a str,
    port: u16,
    checks: HealthChecks,
}

#[derive(Serialize)]
struct HealthChecks {
    server: &'static str,
    memory: MemoryMb,
}

#[derive(Serialize)]
struct MemoryMb {
    used: u64,
    total: u64,
    unit: &'static str,
}

pub fn get(state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    let snapshot = state.provider.snapshot()?;

    let body = HealthBody {
        status: "healthy",
        timestamp: iso_timestamp(&Utc::now()),
        uptime: snapshot.uptime.as_secs_f64(),
        environment: &state.host.environment,
        version: &state.host.version,
        hostname: &state.host.hostname,
        port: state.host.port,
        checks: HealthChecks {
            server: "ok",
            memory: MemoryMb {
                used: snapshot.memory.used_mb(),
                total: snapshot.memory.limit_mb(),
                unit: "MB",
            },
        },
    };

    response::json(StatusCode::OK, &body)
}

pub fn head(state: &ProbeState) -> Result<Response<Body>, ProbeError> {
    state.provider.snapshot()?;
    Ok(response::empty(StatusCode::OK))
}
