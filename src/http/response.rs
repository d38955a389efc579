//! Response translation.
//!
//! # Responsibilities
//! - Turn an `InvocationResult` into an HTTP response
//! - Produce the gateway's own error responses (`{"message": ...}`)
//!
//! # Design Decisions
//! - Order is status, single-value headers, multi-value headers, body
//! - A multi-value header replaces a same-named single-value header rather
//!   than merging with it; handlers may rely on this gateway rule
//! - Content-Type defaults to `application/json` when the handler sets none

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

use crate::invoke::InvocationResult;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("invalid header '{name}'")]
    InvalidHeader { name: String },

    #[error("body is not valid base64: {0}")]
    InvalidBody(#[from] base64::DecodeError),
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), TranslateError> {
    let invalid = || TranslateError::InvalidHeader {
        name: name.to_string(),
    };
    let name_parsed = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value_parsed = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((name_parsed, value_parsed))
}

/// Translate a handler result into a response.
pub fn into_response(result: InvocationResult) -> Result<Response, TranslateError> {
    let status = StatusCode::from_u16(result.status_code)
        .map_err(|_| TranslateError::InvalidStatus(result.status_code))?;

    let body = if result.is_base64_encoded {
        Body::from(BASE64.decode(result.body.as_bytes())?)
    } else {
        Body::from(result.body)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();

    for (name, value) in &result.headers {
        let (name, value) = header_pair(name, value)?;
        headers.insert(name, value);
    }

    for (name, values) in &result.multi_value_headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| TranslateError::InvalidHeader {
            name: name.to_string(),
        })?;
        headers.remove(&name);
        for value in values {
            let (name, value) = header_pair(name.as_str(), value)?;
            headers.append(name, value);
        }
    }

    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(response)
}

/// A gateway-generated response with a JSON `message` body.
pub fn gateway_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        serde_json::json!({ "message": message }).to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_multi_value_overrides_single_value() {
        let result = InvocationResult {
            status_code: 201,
            headers: BTreeMap::from([
                ("X-Foo".to_string(), "1".to_string()),
                ("X-Bar".to_string(), "keep".to_string()),
            ]),
            multi_value_headers: BTreeMap::from([(
                "X-Foo".to_string(),
                vec!["2".to_string(), "3".to_string()],
            )]),
            body: "created".into(),
            is_base64_encoded: false,
        };

        let response = into_response(result).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let foo: Vec<&str> = response
            .headers()
            .get_all("x-foo")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(foo, vec!["2", "3"]);
        assert_eq!(response.headers()["x-bar"], "keep");
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_text(response).await, "created");
    }

    #[tokio::test]
    async fn test_binary_body_is_decoded() {
        let result = InvocationResult {
            status_code: 200,
            headers: BTreeMap::from([("Content-Type".to_string(), "text/plain".to_string())]),
            body: "aGVsbG8=".into(),
            is_base64_encoded: true,
            ..Default::default()
        };
        let response = into_response(result).unwrap();
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(body_text(response).await, "hello");
    }

    #[test]
    fn test_translation_errors() {
        let bad_status = InvocationResult {
            status_code: 42,
            ..Default::default()
        };
        assert!(matches!(into_response(bad_status), Err(TranslateError::InvalidStatus(42))));

        let bad_body = InvocationResult {
            status_code: 200,
            body: "***".into(),
            is_base64_encoded: true,
            ..Default::default()
        };
        assert!(matches!(into_response(bad_body), Err(TranslateError::InvalidBody(_))));

        let bad_header = InvocationResult {
            status_code: 200,
            headers: BTreeMap::from([("bad header".to_string(), "x".to_string())]),
            ..Default::default()
        };
        assert!(matches!(into_response(bad_header), Err(TranslateError::InvalidHeader { .. })));
    }

    #[tokio::test]
    async fn test_gateway_error_shape() {
        let response = gateway_error(StatusCode::FORBIDDEN, "Missing Authentication Token");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            r#"{"message":"Missing Authentication Token"}"#
        );
    }
}
