//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay, store, http layers produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! Handler events carry the `x-request-id` assigned by the HTTP layer.

pub mod logging;
pub mod metrics;
