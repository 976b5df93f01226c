//! Delivery strategy selection.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{request::Parts, Response};

use crate::auth::TokenProvider;
use crate::config::RelayConfig;
use crate::relay::cache::CacheManager;
use crate::relay::delivery::Delivery;
use crate::relay::upstream::UpstreamClient;
use crate::relay::RelayError;
use crate::resolve::ResolvedTarget;
use crate::store::CacheStore;

/// The relay: file delivery and upload forwarding over shared collaborators.
///
/// Configuration is read from the live `ArcSwap` on every call, so a reload
/// applies to the next request without rebuilding the relay. Upstream client
/// settings are fixed at construction.
pub struct Relay {
    pub(crate) config: Arc<ArcSwap<RelayConfig>>,
    pub(crate) upstream: UpstreamClient,
    pub(crate) store: Arc<dyn CacheStore>,
    pub(crate) tokens: Arc<dyn TokenProvider>,
}

impl Relay {
    pub fn new(
        config: Arc<ArcSwap<RelayConfig>>,
        store: Arc<dyn CacheStore>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, RelayError> {
        let upstream = UpstreamClient::from_config(&config.load())?;
        Ok(Self {
            config,
            upstream,
            store,
            tokens,
        })
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn config(&self) -> Arc<RelayConfig> {
        self.config.load_full()
    }

    /// Serve a resolved file.
    ///
    /// Cache-eligible paths go through the cache manager, with the target's
    /// delivery mode as the fallback; everything else is delivered directly
    /// or proxied according to `target.proxied`.
    pub async fn handle_file(
        &self,
        request: &Parts,
        path: &str,
        target: &ResolvedTarget,
    ) -> Result<Response<Body>, RelayError> {
        let config = self.config.load_full();
        let delivery = Delivery::for_target(target.proxied);

        if config.cache.is_eligible(path) {
            let manager = CacheManager::new(&self.upstream, Arc::clone(&self.store), &config.cache);
            return manager
                .cache_or_fallback(request, target.size, &target.url, delivery)
                .await;
        }

        tracing::debug!(path = %path, delivery = ?delivery, "Path not cache-eligible");
        delivery.deliver(&self.upstream, &target.url, request).await
    }
}
