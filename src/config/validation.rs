//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream origin and mount prefix shape
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Validate header names in the exclusion lists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// Upper bound for `upstream.max_redirects`.
pub const MAX_REDIRECT_LIMIT: u32 = 10;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("upstream.base_url `{url}` is invalid: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("upstream.mount_prefix `{prefix}` is invalid: {reason}")]
    MountPrefix { prefix: String, reason: &'static str },

    #[error("upstream.max_redirects {0} exceeds {max}", max = MAX_REDIRECT_LIMIT)]
    TooManyRedirects(u32),

    #[error("{field} contains invalid header name `{name}`")]
    HeaderName { field: &'static str, name: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.upstream_secs ({upstream}) must be shorter than timeouts.request_secs ({request})")]
    UpstreamOutlivesRequest { upstream: u64, request: u64 },

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(reason) = check_base_url(&config.upstream.base_url) {
        errors.push(ValidationError::BaseUrl {
            url: config.upstream.base_url.clone(),
            reason,
        });
    }

    if let Err(reason) = check_mount_prefix(&config.upstream.mount_prefix) {
        errors.push(ValidationError::MountPrefix {
            prefix: config.upstream.mount_prefix.clone(),
            reason,
        });
    }

    if config.upstream.max_redirects > MAX_REDIRECT_LIMIT {
        errors.push(ValidationError::TooManyRedirects(
            config.upstream.max_redirects,
        ));
    }

    for (field, names) in [
        ("headers.strip_request", &config.headers.strip_request),
        ("headers.strip_response", &config.headers.strip_response),
    ] {
        for name in names {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::HeaderName {
                    field,
                    name: name.clone(),
                });
            }
        }
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }
    // upstream_secs bounds the whole redirect chain and must end first.
    if timeouts.upstream_secs >= timeouts.request_secs {
        errors.push(ValidationError::UpstreamOutlivesRequest {
            upstream: timeouts.upstream_secs,
            request: timeouts.request_secs,
        });
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_base_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("must not carry a query or fragment".to_string());
    }
    Ok(())
}

fn check_mount_prefix(prefix: &str) -> Result<(), &'static str> {
    if !prefix.starts_with('/') {
        return Err("must start with `/`");
    }
    if prefix == "/" {
        return Err("must not be the root path");
    }
    if prefix.ends_with('/') {
        return Err("must not end with `/`");
    }
    if prefix.contains(['{', '}', '*', '?', '#']) {
        return Err("must be a literal path");
    }
    Ok(())
}
