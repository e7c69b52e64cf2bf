//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router mounting the relay under the mount prefix
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Bind server to listener, drain on shutdown
//! - Relay requests to the upstream origin

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, upstream_target,
    OutboundRequest,
};
use crate::http::response::{error_response, relay_response, ProxyError};
use crate::http::upstream::{UpstreamClient, UpstreamError};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::security::HeaderPolicy;

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid header policy: {0}")]
    HeaderPolicy(#[from] axum::http::header::InvalidHeaderName),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Read-only state shared by every request.
pub struct Relay {
    pub base_url: String,
    pub mount_prefix: String,
    pub max_redirects: u32,
    pub policy: HeaderPolicy,
    pub client: UpstreamClient,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

/// HTTP server for the forwarding proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The configuration is expected to be validated already.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let relay = Relay {
            base_url: config.upstream.base_url.clone(),
            mount_prefix: config.upstream.mount_prefix.clone(),
            max_redirects: config.upstream.max_redirects,
            policy: HeaderPolicy::from_config(&config.headers)?,
            client: UpstreamClient::new(&config.timeouts)?,
        };
        let state = AppState {
            relay: Arc::new(relay),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mount = config.upstream.mount_prefix.as_str();
        Router::new()
            .route(mount, any(proxy_handler))
            .route(&format!("{mount}/"), any(proxy_handler))
            .route(&format!("{mount}/{{*path}}"), any(proxy_handler))
            .fallback(not_found)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The assembled router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_prefix = %self.config.upstream.mount_prefix,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Relay one request to upstream and hand back its answer.
async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let method_str = method.to_string();
    let request_id = request_id(&headers).to_string();

    let response = match relay(&state.relay, method, &uri, &headers, body).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                ProxyError::Upstream(_) => {
                    metrics::record_upstream_failure();
                    tracing::error!(request_id = %request_id, error = %e, "Upstream error");
                }
                ProxyError::Target(_) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Unroutable request");
                }
            }
            e.into_response()
        }
    };

    metrics::record_request(&method_str, response.status().as_u16(), started);
    response
}

async fn relay(
    relay: &Relay,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let target = upstream_target(&relay.base_url, &relay.mount_prefix, uri)?;
    let outbound = OutboundRequest::from_inbound(method, target, headers, body, &relay.policy);

    tracing::debug!(
        request_id = %request_id(headers),
        method = %outbound.method,
        target = %outbound.url,
        body_bytes = outbound.body_len(),
        "Proxying request"
    );

    let upstream = relay.client.relay(outbound, relay.max_redirects).await?;
    Ok(relay_response(upstream, &relay.policy))
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}
