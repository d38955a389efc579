//! CORS header injection.
//!
//! Routes with `cors_enabled` get an allow-any-origin header on every
//! response, and `OPTIONS` requests to their paths are answered as
//! preflights unless an explicit `OPTIONS` route exists.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::config::HttpMethod;

/// Headers the upstream gateway allows by default in preflight responses.
pub const DEFAULT_ALLOW_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

/// Add the allow-origin header unless the handler already set one.
pub fn apply(headers: &mut HeaderMap) {
    if !headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

/// Preflight response listing `methods` plus OPTIONS.
pub fn preflight(methods: &[HttpMethod]) -> Response {
    let mut allowed: Vec<&str> = methods.iter().map(HttpMethod::as_str).collect();
    if !allowed.contains(&"OPTIONS") {
        allowed.push("OPTIONS");
    }

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    apply(headers);
    if let Ok(value) = HeaderValue::from_str(&allowed.join(",")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(DEFAULT_ALLOW_HEADERS),
    );
    response
}
