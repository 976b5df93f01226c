//! Drive relay library.
//!
//! Serves files from a cloud drive by redirecting, proxying or caching, and
//! forwards uploads with a server-side credential.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resolve;
pub mod store;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{Relay, RelayError};
