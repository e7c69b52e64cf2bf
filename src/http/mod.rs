//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, mount prefix routing, middleware)
//!     → request.rs (upstream target, outbound headers/body, request ID)
//!     → upstream.rs (send, buffer, transport error classification)
//!     → redirect.rs (decide whether a 3xx is replayed)
//!     → response.rs (filter headers, 204 handling, error envelope)
//!     → Send to client
//! ```

pub mod redirect;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use redirect::resolve_redirect;
pub use request::{upstream_target, OutboundRequest, TargetError, X_REQUEST_ID};
pub use response::{relay_response, ProxyError, PROXY_CONNECTION_FAILED};
pub use server::{HttpServer, ServerError};
pub use upstream::{UpstreamClient, UpstreamError, UpstreamResponse};
