//! Delivery strategy and caching.
//!
//! # Data Flow
//! ```text
//! (request, path, ResolvedTarget)
//!     → selector.rs   cache-eligible path?
//!         yes → cache.rs   Range? size tier?
//!                 ├─ fullCache   fetch, buffer, store copy
//!                 ├─ chunkCache  fetch, tee.rs fork, store in background
//!                 └─ fallback ─┐
//!         no ──────────────────┤
//!                              ▼
//!               delivery.rs  Direct (302) | Proxied (stream, range-aware)
//!
//! (request, dir, filename)
//!     → upload.rs  credential → PUT body unchanged → upstream response
//! ```
//!
//! Every relay-built response carries only the projected headers from
//! headers.rs plus its `x-provider` tag.

pub mod cache;
pub mod delivery;
pub mod error;
pub mod headers;
pub mod selector;
pub mod tee;
pub mod upload;
pub mod upstream;

pub use cache::{CacheDecision, CacheManager};
pub use delivery::Delivery;
pub use error::RelayError;
pub use headers::{Provider, X_PROVIDER};
pub use selector::Relay;
pub use upstream::UpstreamClient;
