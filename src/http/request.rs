//! Request translation.
//!
//! # Responsibilities
//! - Convert an inbound HTTP request into an `InvocationEvent`
//! - Project query parameters and headers into single- and multi-value maps
//! - Base64-encode the body; an empty body becomes `null`
//!
//! # Design Decisions
//! - Single-value maps take the last occurrence; multi-value maps keep all,
//!   in order
//! - Header names are passed on as the HTTP stack delivers them; matching
//!   them case-insensitively is up to the handler
//! - Malformed input degrades to empty or partial maps, never an error

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::ConnectInfo;
use axum::http::{request::Parts, HeaderMap, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use url::form_urlencoded;
use uuid::Uuid;

use crate::invoke::event::{Identity, InvocationEvent, RequestContext};
use crate::routing::RouteMatch;

/// Single-value (last wins) and multi-value projections of one source.
pub type ValueMaps = (BTreeMap<String, String>, BTreeMap<String, Vec<String>>);

fn project<I>(pairs: I) -> ValueMaps
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut single = BTreeMap::new();
    let mut multi: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in pairs {
        single.insert(name.clone(), value.clone());
        multi.entry(name).or_default().push(value);
    }
    (single, multi)
}

/// Bracketed names (`a[]`, `a[b]`) carry arrays or objects, not plain strings.
fn is_plain_parameter(name: &str) -> bool {
    !name.is_empty() && !name.contains('[') && !name.contains(']')
}

pub fn query_parameters(query: Option<&str>) -> ValueMaps {
    let query = query.unwrap_or_default();
    project(
        form_urlencoded::parse(query.as_bytes())
            .filter(|(name, _)| is_plain_parameter(name))
            .map(|(name, value)| (name.into_owned(), value.into_owned())),
    )
}

pub fn header_values(headers: &HeaderMap) -> ValueMaps {
    project(headers.iter().filter_map(|(name, value)| {
        value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
    }))
}

/// Body as sent to the handler: base64 text, or `None` when empty.
pub fn encode_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        None
    } else {
        Some(BASE64.encode(body))
    }
}

fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Build the canonical event for a request matched to a function route.
pub fn build_event(parts: &Parts, body: &[u8], matched: &RouteMatch, stage: &str) -> InvocationEvent {
    let path = parts.uri.path().to_string();
    let method = parts.method.as_str().to_string();
    let resource = matched.route.pattern.resource();

    let (query_string_parameters, multi_value_query_string_parameters) =
        query_parameters(parts.uri.query());
    let (headers, multi_value_headers) = header_values(&parts.headers);

    let path_parameters = matched.wildcard.iter().cloned().collect();

    let source_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let user_agent = parts
        .headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = encode_body(body);
    let is_base64_encoded = body.is_some();

    InvocationEvent {
        resource: resource.clone(),
        path: path.clone(),
        http_method: method.clone(),
        headers,
        multi_value_headers,
        query_string_parameters,
        multi_value_query_string_parameters,
        path_parameters,
        stage_variables: BTreeMap::new(),
        request_context: RequestContext {
            resource_path: resource,
            http_method: method,
            path,
            protocol: protocol(parts.version).to_string(),
            stage: stage.to_string(),
            request_id: Uuid::new_v4().to_string(),
            request_time_epoch: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            identity: Identity {
                source_ip,
                user_agent,
            },
        },
        body,
        is_base64_encoded,
    }
}
