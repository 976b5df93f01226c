//! In-memory cache store.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Response, StatusCode};
use bytes::Bytes;
use dashmap::DashMap;

use super::{CacheError, CacheKey, CacheStore};

/// Snapshot of a response as it was handed to the store.
#[derive(Debug, Clone)]
struct StoredResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    stored_at: Instant,
}

/// A thread-safe store of buffered responses, bounded by entry count.
///
/// When full, the oldest entry is evicted to make room.
#[derive(Clone)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<CacheKey, StoredResponse>>,
    max_entries: usize,
}

impl MemoryCacheStore {
    /// Create an empty store holding at most `max_entries` responses.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Stored body bytes for `key`, if any.
    pub fn body(&self, key: &CacheKey) -> Option<Bytes> {
        self.inner.get(key).map(|r| r.value().body.clone())
    }

    fn evict_oldest(&self) {
        let oldest = self
            .inner
            .iter()
            .min_by_key(|r| r.value().stored_at)
            .map(|r| r.key().clone());
        if let Some(key) = oldest {
            tracing::debug!(key = %key, "Evicting oldest cache entry");
            self.inner.remove(&key);
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Option<Response<Body>> {
        let stored = self.inner.get(key)?.value().clone();

        let mut response = Response::new(Body::from(stored.body));
        *response.status_mut() = stored.status;
        *response.headers_mut() = stored.headers;
        Some(response)
    }

    async fn put(&self, key: CacheKey, response: Response<Body>) -> Result<(), CacheError> {
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| CacheError::Body {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if !self.inner.contains_key(&key) && self.inner.len() >= self.max_entries {
            self.evict_oldest();
        }

        tracing::debug!(key = %key, bytes = body.len(), "Stored cache entry");
        self.inner.insert(
            key,
            StoredResponse {
                status: parts.status,
                headers: parts.headers,
                body,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
