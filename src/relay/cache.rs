//! Cache Manager.
//!
//! Decides, per request, whether a file is cached whole, cached through a
//! stream fork, or not cached at all, and writes the duplicate response to
//! the store. Cache writes are best-effort: a failed write is logged and the
//! client still gets its response.
//!
//! ```text
//! Range header present              → fallback delivery, store untouched
//! size <  entire_file_cache_limit   → buffer once, store copy      (fullCache)
//! size <  chunked_cache_limit       → tee body, store in background (chunkCache)
//! otherwise                         → fallback delivery, store untouched
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{HeaderMap, RANGE};
use axum::http::{request::Parts, Method, Response, StatusCode};
use bytes::BytesMut;
use futures_util::{stream, StreamExt};

use crate::config::CacheConfig;
use crate::observability::metrics;
use crate::relay::delivery::{relay_response, Delivery};
use crate::relay::headers::{project_headers, propagate_etag, tag_provider, Provider};
use crate::relay::tee::tee;
use crate::relay::upstream::UpstreamClient;
use crate::relay::RelayError;
use crate::store::{CacheKey, CacheStore};

/// Outcome of the caching rules for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Partial content is never cached.
    RangeBypass,
    /// Small enough to buffer and cache whole.
    Entire,
    /// Cache while streaming through a fork.
    Chunked,
    /// Above the chunked ceiling.
    TooLarge,
}

impl CacheDecision {
    /// Apply the caching rules in order.
    pub fn decide(has_range: bool, file_size: u64, config: &CacheConfig) -> Self {
        if has_range {
            CacheDecision::RangeBypass
        } else if file_size < config.entire_file_cache_limit {
            CacheDecision::Entire
        } else if file_size < config.chunked_cache_limit {
            CacheDecision::Chunked
        } else {
            CacheDecision::TooLarge
        }
    }
}

/// Applies cache-write rules for one relay instance.
pub struct CacheManager<'a> {
    upstream: &'a UpstreamClient,
    store: Arc<dyn CacheStore>,
    config: &'a CacheConfig,
}

impl<'a> CacheManager<'a> {
    pub fn new(upstream: &'a UpstreamClient, store: Arc<dyn CacheStore>, config: &'a CacheConfig) -> Self {
        Self {
            upstream,
            store,
            config,
        }
    }

    /// Serve `url` for `request`, populating the cache when the rules allow,
    /// otherwise handing off to `fallback` and returning its response as is.
    pub async fn cache_or_fallback(
        &self,
        request: &Parts,
        file_size: u64,
        url: &str,
        fallback: Delivery,
    ) -> Result<Response<Body>, RelayError> {
        let decision = CacheDecision::decide(request.headers.contains_key(RANGE), file_size, self.config);
        match decision {
            CacheDecision::RangeBypass => {
                tracing::info!(uri = %request.uri, "No cache: range request");
                fallback.deliver(self.upstream, url, request).await
            }
            CacheDecision::Entire => {
                tracing::info!(uri = %request.uri, file_size, "Cache entire file");
                self.cache_entire(request, url).await
            }
            CacheDecision::Chunked => {
                tracing::info!(uri = %request.uri, file_size, "Chunk cache file");
                self.cache_chunked(request, url).await
            }
            CacheDecision::TooLarge => {
                tracing::info!(
                    uri = %request.uri,
                    file_size,
                    limit = self.config.chunked_cache_limit,
                    "No cache: file exceeds chunked cache limit"
                );
                fallback.deliver(self.upstream, url, request).await
            }
        }
    }

    async fn cache_entire(&self, request: &Parts, url: &str) -> Result<Response<Body>, RelayError> {
        let (parts, body) = self.upstream.fetch(url, HeaderMap::new()).await?.into_parts();

        let mut headers = project_headers(&parts.headers);
        tag_provider(&mut headers, Provider::FullCache);
        metrics::record_delivery(Provider::FullCache.as_str());

        // The declared size put this file in the small tier. If the upstream
        // disagrees, stop buffering at the chunked ceiling and stream the rest.
        let ceiling = usize::try_from(self.config.chunked_cache_limit).unwrap_or(usize::MAX);
        let mut source = body.into_data_stream();
        let mut buffered = BytesMut::new();
        while let Some(chunk) = source.next().await {
            let chunk = chunk.map_err(|e| RelayError::Body(e.to_string()))?;
            if buffered.len() + chunk.len() > ceiling {
                tracing::info!(
                    uri = %request.uri,
                    limit = self.config.chunked_cache_limit,
                    "No cache: upstream body exceeds chunked cache limit"
                );
                metrics::record_cache_write("skipped");
                let prefix = stream::iter([Ok(buffered.freeze()), Ok(chunk)]);
                let body = Body::from_stream(prefix.chain(source));
                return Ok(relay_response(parts.status, headers, body));
            }
            buffered.extend_from_slice(&chunk);
        }
        let bytes = buffered.freeze();

        if should_store(request, parts.status) {
            let duplicate = relay_response(parts.status, headers.clone(), Body::from(bytes.clone()));
            write_entry(self.store.as_ref(), CacheKey::from_request(request), duplicate).await;
        }

        Ok(relay_response(parts.status, headers, Body::from(bytes)))
    }

    async fn cache_chunked(&self, request: &Parts, url: &str) -> Result<Response<Body>, RelayError> {
        let (parts, body) = self.upstream.fetch(url, HeaderMap::new()).await?.into_parts();

        let mut headers = project_headers(&parts.headers);
        tag_provider(&mut headers, Provider::ChunkCache);
        propagate_etag(&parts.headers, &mut headers);
        metrics::record_delivery(Provider::ChunkCache.as_str());

        if !should_store(request, parts.status) {
            return Ok(relay_response(parts.status, headers, body));
        }

        // The store branch is drained in the background so the client can
        // start reading before the whole file has been stored.
        let (client_body, store_body) = tee(body);
        let duplicate = relay_response(parts.status, headers.clone(), store_body);
        let store = Arc::clone(&self.store);
        let key = CacheKey::from_request(request);
        tokio::spawn(async move {
            write_entry(store.as_ref(), key, duplicate).await;
        });

        Ok(relay_response(parts.status, headers, client_body))
    }
}

/// Only successful upstream responses become cache entries.
fn cacheable(status: StatusCode) -> bool {
    status.is_success()
}

/// Entries are only ever looked up for `GET`, so nothing else is stored.
fn should_store(request: &Parts, status: StatusCode) -> bool {
    if request.method != Method::GET {
        tracing::debug!(uri = %request.uri, method = %request.method, "Not a GET, skipping store");
        metrics::record_cache_write("skipped");
        return false;
    }
    if !cacheable(status) {
        tracing::debug!(uri = %request.uri, status = %status, "Upstream status not cacheable, skipping store");
        metrics::record_cache_write("skipped");
        return false;
    }
    true
}

async fn write_entry(store: &dyn CacheStore, key: CacheKey, response: Response<Body>) {
    let key_str = key.to_string();
    match store.put(key, response).await {
        Ok(()) => metrics::record_cache_write("stored"),
        Err(e) => {
            tracing::warn!(key = %key_str, error = %e, "Cache write failed");
            metrics::record_cache_write("failed");
        }
    }
}
