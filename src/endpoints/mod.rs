// src/endpoints/mod.rs
//! The probe routes.
//!
//! Every route is a profile over the same [`ProbeAggregator`]: a list of
//! checks plus the status mapping it is served with. Route modules return
//! `Result` and [`Endpoint::respond`] turns an error into that route's fixed
//! failure payload.

mod health;
mod healthz;
mod live;
mod ready;
pub mod response;

use chrono::Utc;
use hyper::{Body, Method, Response, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::Config;
use crate::metrics::MetricsCollector;
use crate::probe::{iso_timestamp, MemoryCheck, OverallStatus, ProbeAggregator, ProbeReport};
use crate::system::{HostInfo, MetricsError, MetricsProvider};

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read-only state shared by every request.
pub struct ProbeState {
    pub config: Config,
    pub host: HostInfo,
    pub provider: Arc<dyn MetricsProvider>,
    pub metrics: Option<Arc<MetricsCollector>>,
}

impl ProbeState {
    pub fn new(config: Config, host: HostInfo, provider: Arc<dyn MetricsProvider>) -> Self {
        Self {
            config,
            host,
            provider,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Log and record a finished report.
    pub fn observe(&self, report: &ProbeReport) {
        for check in report.failed_checks() {
            warn!(check = %check.name, detail = %check.detail, "probe check failed");
        }
        match report.status {
            OverallStatus::Unhealthy => error!(status = report.status.as_str(), "probe unhealthy"),
            OverallStatus::Degraded => warn!(status = report.status.as_str(), "probe degraded"),
            OverallStatus::Healthy => {}
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_report(report);
        }
    }
}

/// Quick traffic gate for HEAD probes: 503 once memory passes the critical
/// ratio or can't be read.
pub(crate) fn memory_gate(state: &ProbeState) -> ProbeReport {
    let memory = MemoryCheck::critical(state.provider.as_ref(), &state.config.probes.memory);
    ProbeAggregator::default().evaluate(&[&memory])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Health,
    Healthz,
    Live,
    Ready,
}

impl Endpoint {
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/health" | "/api/health" => Some(Endpoint::Health),
            "/api/healthz" => Some(Endpoint::Healthz),
            "/api/live" => Some(Endpoint::Live),
            "/api/ready" => Some(Endpoint::Ready),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::Health => "health",
            Endpoint::Healthz => "healthz",
            Endpoint::Live => "live",
            Endpoint::Ready => "ready",
        }
    }

    pub fn respond(&self, state: &ProbeState, method: &Method) -> Response<Body> {
        let result = match (*self, method) {
            (Endpoint::Health, &Method::GET) => health::get(state),
            (Endpoint::Health, &Method::HEAD) => health::head(state),
            (Endpoint::Healthz, &Method::GET) => healthz::get(state),
            (Endpoint::Healthz, &Method::HEAD) => healthz::head(state),
            (Endpoint::Live, &Method::GET) => live::get(state),
            (Endpoint::Live, &Method::HEAD) => live::head(state),
            (Endpoint::Ready, &Method::GET) => ready::get(state),
            (Endpoint::Ready, &Method::HEAD) => ready::head(state),
            _ => return response::method_not_allowed(),
        };

        result.unwrap_or_else(|err| {
            error!(endpoint = self.label(), %method, %err, "probe failed");
            self.failure(method, &err)
        })
    }

    fn failure(&self, method: &Method, err: &ProbeError) -> Response<Body> {
        let code = match (self, method) {
            (Endpoint::Health, &Method::HEAD) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };
        if *method == Method::HEAD {
            return response::empty(code);
        }

        let timestamp = iso_timestamp(&Utc::now());
        let error = err.to_string();
        let body = match self {
            Endpoint::Health | Endpoint::Healthz => {
                json!({ "status": "unhealthy", "timestamp": timestamp, "error": error })
            }
            Endpoint::Live => json!({ "status": "dead", "timestamp": timestamp, "error": error }),
            Endpoint::Ready => json!({ "timestamp": timestamp, "ready": false, "error": error }),
        };
        response::json_value(code, body)
    }
}
