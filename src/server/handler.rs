// src/server/handler.rs
use hyper::{Body, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::{debug, Instrument};

use crate::endpoints::{response, Endpoint, ProbeState};
use crate::metrics::Timer;

#[derive(Clone)]
pub struct ProbeHandler {
    state: Arc<ProbeState>,
}

impl ProbeHandler {
    pub fn new(state: Arc<ProbeState>) -> Self {
        Self { state }
    }

    pub fn handle(&self, req: &Request<Body>) -> Response<Body> {
        let timer = Timer::new();
        let method = req.method();

        let Some(endpoint) = Endpoint::from_path(req.uri().path()) else {
            debug!(path = req.uri().path(), "no such probe");
            return response::not_found();
        };

        let response = endpoint.respond(&self.state, method);

        if let Some(metrics) = &self.state.metrics {
            metrics.record_request(
                endpoint.label(),
                method.as_str(),
                response.status().as_u16(),
                timer.elapsed(),
            );
        }
        debug!(
            endpoint = endpoint.label(),
            status = response.status().as_u16(),
            elapsed_ms = timer.elapsed().as_millis() as u64,
            "probe served"
        );

        response
    }
}

impl Service<Request<Body>> for ProbeHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        let span = tracing::debug_span!(
            "request",
            id = %uuid::Uuid::new_v4(),
            method = %req.method(),
            path = req.uri().path(),
        );
        Box::pin(async move { Ok(handler.handle(&req)) }.instrument(span))
    }
}
