//! Outbound client towards the upstream origin.
//!
//! # Responsibilities
//! - Send one fully buffered request and buffer the full response
//! - Replay redirects through `redirect::resolve_redirect`, bounded
//! - Classify transport failures (DNS, connect, TLS, timeout, body read)
//!
//! # Design Decisions
//! - One pooled `reqwest::Client`, built at startup, shared by all requests
//! - Automatic redirect following is disabled; the relay owns 3xx handling
//! - No retries: a transport failure is final

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use reqwest::redirect;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::http::redirect::resolve_redirect;
use crate::http::request::OutboundRequest;
use crate::observability::metrics;

/// A transport-level failure talking to upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build upstream client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("upstream request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl UpstreamError {
    fn classify(url: &url::Url, source: reqwest::Error) -> Self {
        let url = url.to_string();
        if source.is_timeout() {
            Self::Timeout { url }
        } else if source.is_connect() {
            Self::Connect { url, source }
        } else {
            Self::Transport { url, source }
        }
    }
}

/// A fully buffered upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Pooled HTTP client for the upstream origin.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    inner: reqwest::Client,
    /// Budget for a whole relay, every redirect hop included.
    deadline: Duration,
}

impl UpstreamClient {
    /// Build a client with the configured timeouts and redirects disabled.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, UpstreamError> {
        let deadline = Duration::from_secs(timeouts.upstream_secs);
        let inner = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(deadline)
            .build()
            .map_err(UpstreamError::Build)?;
        Ok(Self { inner, deadline })
    }

    /// Send a single request, without following redirects.
    pub async fn send(&self, request: &OutboundRequest) -> Result<UpstreamResponse, UpstreamError> {
        let mut builder = self
            .inner
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| UpstreamError::classify(&request.url, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::classify(&request.url, e))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }

    /// Send a request, replaying at most `max_redirects` redirects.
    ///
    /// The response that ends the loop is returned as-is, even when it is
    /// itself a redirect. The whole chain shares one `upstream_secs` budget.
    pub async fn relay(
        &self,
        request: OutboundRequest,
        max_redirects: u32,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let url = request.url.to_string();
        tokio::time::timeout(self.deadline, self.follow(request, max_redirects))
            .await
            .map_err(|_| UpstreamError::Timeout { url })?
    }

    async fn follow(
        &self,
        mut request: OutboundRequest,
        max_redirects: u32,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut hops = 0;
        loop {
            let response = self.send(&request).await?;
            if hops >= max_redirects {
                return Ok(response);
            }
            match resolve_redirect(&request, response.status, &response.headers) {
                Some(next) => {
                    tracing::debug!(
                        status = %response.status,
                        from = %request.url,
                        to = %next.url,
                        "Replaying redirect"
                    );
                    metrics::record_redirect();
                    hops += 1;
                    request = next;
                }
                None => return Ok(response),
            }
        }
    }
}
