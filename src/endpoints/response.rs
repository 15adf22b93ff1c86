// src/endpoints/response.rs
use hyper::header::{HeaderMap, HeaderValue, ALLOW, CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use hyper::{Body, Response, StatusCode};
use serde::Serialize;

use super::ProbeError;

/// Probe answers must never be served from an intermediary cache.
fn no_cache(headers: &mut HeaderMap) {
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}

pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, ProbeError> {
    let bytes = serde_json::to_vec(body)?;
    Ok(json_bytes(status, bytes))
}

/// JSON response from an already-built value. Cannot fail.
pub fn json_value(status: StatusCode, body: serde_json::Value) -> Response<Body> {
    json_bytes(status, body.to_string().into_bytes())
}

fn json_bytes(status: StatusCode, bytes: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    no_cache(headers);
    response
}

pub fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    no_cache(response.headers_mut());
    response
}

pub fn method_not_allowed() -> Response<Body> {
    let mut response = empty(StatusCode::METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

pub fn not_found() -> Response<Body> {
    let mut response = Response::new(Body::from("Not Found"));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
