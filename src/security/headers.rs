//! Header manipulation across the relay boundary.
//!
//! # Responsibilities
//! - Drop inbound headers that belong to the client→proxy leg (`host`, `connection`)
//! - Optionally drop `accept-encoding` so upstream bodies arrive uncompressed
//! - Strip framing headers from upstream responses; the body is re-framed here
//!
//! # Design Decisions
//! - Configured exclusion lists extend a fixed floor; config can add names,
//!   never re-admit `host`, `connection` or the framing headers
//! - `content-length` / `transfer-encoding` never cross outbound; the
//!   request module recomputes framing for the buffered body
//! - Multi-valued headers are copied value by value, order preserved

use axum::http::header::{self, HeaderMap, HeaderName, InvalidHeaderName};

use crate::config::HeaderPolicyConfig;

/// Never copied to the upstream request, whatever the config says.
const OUTBOUND_ALWAYS_EXCLUDED: [HeaderName; 4] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
];

/// Never copied to the client response, whatever the config says.
const RESPONSE_ALWAYS_EXCLUDED: [HeaderName; 3] = [
    header::TRANSFER_ENCODING,
    header::CONTENT_ENCODING,
    header::CONTENT_LENGTH,
];

/// Which headers survive each direction of the relay.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    request_excluded: Vec<HeaderName>,
    response_excluded: Vec<HeaderName>,
}

impl HeaderPolicy {
    /// Build a policy from explicit exclusion lists.
    pub fn new(request_excluded: Vec<HeaderName>, response_excluded: Vec<HeaderName>) -> Self {
        Self {
            request_excluded,
            response_excluded,
        }
    }

    /// Build a policy from configuration.
    pub fn from_config(config: &HeaderPolicyConfig) -> Result<Self, InvalidHeaderName> {
        let mut request_excluded = parse_names(&config.strip_request)?;
        if config.strip_accept_encoding && !request_excluded.contains(&header::ACCEPT_ENCODING) {
            request_excluded.push(header::ACCEPT_ENCODING);
        }
        let response_excluded = parse_names(&config.strip_response)?;
        Ok(Self::new(request_excluded, response_excluded))
    }

    /// Whether an inbound header may be copied to the upstream request.
    pub fn forwards_request_header(&self, name: &HeaderName) -> bool {
        !OUTBOUND_ALWAYS_EXCLUDED.contains(name) && !self.request_excluded.contains(name)
    }

    /// Whether an upstream header may be copied to the final response.
    pub fn forwards_response_header(&self, name: &HeaderName) -> bool {
        !RESPONSE_ALWAYS_EXCLUDED.contains(name) && !self.response_excluded.contains(name)
    }

    /// Headers to send upstream, given the inbound set.
    pub fn outbound_headers(&self, inbound: &HeaderMap) -> HeaderMap {
        copy_where(inbound, |name| self.forwards_request_header(name))
    }

    /// Headers to send back to the client, given the upstream set.
    pub fn response_headers(&self, upstream: &HeaderMap) -> HeaderMap {
        copy_where(upstream, |name| self.forwards_response_header(name))
    }
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self::new(
            vec![header::HOST, header::CONNECTION, header::ACCEPT_ENCODING],
            vec![
                header::TRANSFER_ENCODING,
                header::CONTENT_ENCODING,
                header::CONTENT_LENGTH,
            ],
        )
    }
}

fn parse_names(names: &[String]) -> Result<Vec<HeaderName>, InvalidHeaderName> {
    // HeaderName::from_bytes lowercases, so config matching is case-insensitive
    names
        .iter()
        .map(|name| HeaderName::from_bytes(name.as_bytes()))
        .collect()
}

fn copy_where(source: &HeaderMap, keep: impl Fn(&HeaderName) -> bool) -> HeaderMap {
    let mut copied = HeaderMap::with_capacity(source.len());
    for (name, value) in source.iter() {
        if keep(name) {
            copied.append(name.clone(), value.clone());
        }
    }
    copied
}
