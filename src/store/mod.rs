//! Response cache storage.
//!
//! # Data Flow
//! ```text
//! Cache Manager (relay/cache.rs)
//!     → CacheKey::from_request(original request)
//!     → CacheStore::put(key, duplicate response)     best-effort, logged on failure
//!
//! HTTP layer (http/server.rs)
//!     → CacheStore::get(key) before resolving a cache-eligible path
//! ```
//!
//! The store is injected as `Arc<dyn CacheStore>` so tests can substitute
//! recording or failing doubles.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{request::Parts, Method, Response};
use thiserror::Error;

pub use memory::MemoryCacheStore;

/// Identity of a cacheable request: method plus full request URI.
///
/// Relay responses never carry `Vary`, so no request headers take part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub uri: String,
}

impl CacheKey {
    /// Derive the key from the client request that caused the cache write.
    pub fn from_request(request: &Parts) -> Self {
        Self {
            method: request.method.clone(),
            uri: request.uri.to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.uri)
    }
}

/// Errors from cache storage.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The response body could not be read to completion.
    #[error("failed to read response body for {key}: {reason}")]
    Body { key: String, reason: String },
}

/// A place to keep response snapshots.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a stored response. Each call returns a fresh, readable body.
    async fn get(&self, key: &CacheKey) -> Option<Response<Body>>;

    /// Persist `response`, consuming its body.
    async fn put(&self, key: CacheKey, response: Response<Body>) -> Result<(), CacheError>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
