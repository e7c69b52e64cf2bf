//! Request handling and transformation.
//!
//! # Responsibilities
//! - Map an inbound path under the mount prefix to the upstream URL
//! - Decide whether a body travels upstream (never for GET/HEAD)
//! - Prepare the outbound header set and its framing
//! - Request ID generation and propagation
//!
//! # Design Decisions
//! - Target URL is plain concatenation `<base><path - prefix><?query>`,
//!   then parsed once so the redirect step can resolve against it
//! - Bodies are fully buffered; `content-length` is always exact
//! - The inbound request is never mutated; a detached copy is forwarded

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use bytes::Bytes;
use thiserror::Error;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer,
};
use url::Url;

use crate::security::HeaderPolicy;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer assigning a UUID v4 `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer echoing the request id back on the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read the request id of an inbound request, for logging.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Failure to derive an upstream URL from an inbound request.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("path `{path}` is not under mount prefix `{prefix}`")]
    OutsideMount { path: String, prefix: String },

    #[error("upstream target `{target}` is not a valid URL: {source}")]
    InvalidUrl {
        target: String,
        #[source]
        source: url::ParseError,
    },
}

/// Build the upstream URL for an inbound request URI.
///
/// The mount prefix only routes; it is removed and the remainder (path and
/// query, untouched) is appended to `base`.
pub fn upstream_target(base: &str, mount_prefix: &str, uri: &Uri) -> Result<Url, TargetError> {
    let path = uri.path();
    let rest = path
        .strip_prefix(mount_prefix)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(|| TargetError::OutsideMount {
            path: path.to_string(),
            prefix: mount_prefix.to_string(),
        })?;

    let target = match uri.query() {
        Some(query) => format!("{base}{rest}?{query}"),
        None => format!("{base}{rest}"),
    };

    Url::parse(&target).map_err(|source| TargetError::InvalidUrl { target, source })
}

/// Whether requests with this method carry a body upstream.
pub fn method_carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// A fully materialized request to the upstream origin.
///
/// Cheap to clone (`Bytes` body), which the redirect replay relies on.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl OutboundRequest {
    /// Derive the outbound request from the inbound parts.
    pub fn from_inbound(
        method: Method,
        url: Url,
        inbound_headers: &HeaderMap,
        inbound_body: Bytes,
        policy: &HeaderPolicy,
    ) -> Self {
        let mut headers = policy.outbound_headers(inbound_headers);

        let body = if method_carries_body(&method) {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(inbound_body.len()));
            Some(inbound_body)
        } else {
            None
        };

        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Same request, aimed elsewhere.
    pub fn retarget(&self, url: Url) -> Self {
        Self {
            url,
            ..self.clone()
        }
    }

    /// Number of body bytes that will be sent.
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }
}
