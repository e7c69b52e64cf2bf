//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http handler / upstream client produce:
//!     → logging.rs (structured log events, request id in every line)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```

pub mod logging;
pub mod metrics;
