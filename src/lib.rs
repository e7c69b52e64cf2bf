//! Same-origin forwarding proxy for the bobyak club/mission backend.
//!
//! Every request under the mount prefix (default `/api/proxy`) is relayed to
//! one fixed upstream origin: method, headers and body are forwarded, a
//! redirect is replayed with `Authorization` intact, and the upstream answer
//! is handed back with its framing headers stripped.

// Core subsystems
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
