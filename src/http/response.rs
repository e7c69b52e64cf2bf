//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform the buffered upstream response for the client
//! - Strip framing headers (the serving layer re-frames the body)
//! - Keep `204 No Content` bodiless
//! - Map proxy-side failures to the JSON error envelope
//!
//! # Design Decisions
//! - Upstream 4xx/5xx are relayed byte-for-byte, never reinterpreted
//! - The only synthesized upstream failure is 502 with `{"detail": ...}`,
//!   the same field the backend uses for its own errors

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::http::request::TargetError;
use crate::http::upstream::{UpstreamError, UpstreamResponse};
use crate::security::HeaderPolicy;

/// Message returned when upstream cannot be reached.
pub const PROXY_CONNECTION_FAILED: &str = "Proxy connection failed.";

/// JSON body for errors produced by the proxy itself.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub detail: String,
}

/// Build a JSON error response.
pub fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorEnvelope {
            detail: detail.into(),
        }),
    )
        .into_response()
}

/// Failures the handler turns into a synthesized response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Target(#[from] TargetError),
}

impl ProxyError {
    /// Status code of the synthesized response.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Target(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let detail = match &self {
            Self::Upstream(_) => PROXY_CONNECTION_FAILED.to_string(),
            Self::Target(e) => e.to_string(),
        };
        error_response(self.status(), detail)
    }
}

/// Turn the final upstream response into the client response.
pub fn relay_response(upstream: UpstreamResponse, policy: &HeaderPolicy) -> Response {
    let body = if upstream.status == StatusCode::NO_CONTENT {
        Body::empty()
    } else {
        Body::from(upstream.body)
    };

    let mut response = Response::new(body);
    *response.status_mut() = upstream.status;
    *response.headers_mut() = policy.response_headers(&upstream.headers);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderMap, HeaderValue};
    use bytes::Bytes;

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    fn upstream(status: StatusCode, body: &'static [u8]) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        UpstreamResponse {
            status,
            headers,
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn test_relay_keeps_status_and_body() {
        let response = relay_response(
            upstream(StatusCode::CREATED, br#"{"id":1}"#),
            &HeaderPolicy::default(),
        );

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
        assert!(response.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(body_bytes(response).await, Bytes::from_static(br#"{"id":1}"#));
    }

    #[tokio::test]
    async fn test_upstream_errors_relayed_verbatim() {
        let response = relay_response(
            upstream(StatusCode::UNPROCESSABLE_ENTITY, br#"{"detail":[{"msg":"bad"}]}"#),
            &HeaderPolicy::default(),
        );

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_bytes(response).await,
            Bytes::from_static(br#"{"detail":[{"msg":"bad"}]}"#)
        );
    }

    #[tokio::test]
    async fn test_no_content_has_empty_body() {
        let response = relay_response(
            upstream(StatusCode::NO_CONTENT, b"stray"),
            &HeaderPolicy::default(),
        );

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_envelope() {
        let err = ProxyError::Upstream(UpstreamError::Timeout {
            url: "https://backend.example.com/api/teams/me".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(json, serde_json::json!({ "detail": PROXY_CONNECTION_FAILED }));
    }
}
