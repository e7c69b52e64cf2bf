//! Security subsystem.
//!
//! The proxy authenticates nobody; it only decides what crosses the relay.
//!
//! # Data Flow
//! ```text
//! Inbound headers  → headers.rs (request exclusion set)  → upstream
//! Upstream headers → headers.rs (response exclusion set) → client
//! ```
//!
//! Body size limits are enforced by the HTTP layer (`limits.max_body_bytes`).

pub mod headers;

pub use headers::HeaderPolicy;
