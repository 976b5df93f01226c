//! Path resolution.
//!
//! Turning a request path into a storage download URL belongs to the
//! surrounding system. The relay only sees the result, a `ResolvedTarget`,
//! through the `TargetResolver` seam.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use crate::config::RelayConfig;
use crate::relay::RelayError;

/// Where a file lives upstream and how it may be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Upstream download URL, as produced by the resolver.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// Must be streamed through the relay rather than redirected to.
    pub proxied: bool,
}

/// Maps request paths to upstream targets.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    /// `Ok(None)` means the path does not name a file.
    async fn resolve(&self, path: &str) -> Result<Option<ResolvedTarget>, RelayError>;
}

/// Resolves against the `[[files]]` table of the live configuration.
#[derive(Clone)]
pub struct StaticResolver {
    config: Arc<ArcSwap<RelayConfig>>,
}

impl StaticResolver {
    pub fn new(config: Arc<ArcSwap<RelayConfig>>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TargetResolver for StaticResolver {
    async fn resolve(&self, path: &str) -> Result<Option<ResolvedTarget>, RelayError> {
        let config = self.config.load();
        Ok(config
            .files
            .iter()
            .find(|file| file.path == path)
            .map(|file| ResolvedTarget {
                url: file.download_url.clone(),
                size: file.size,
                proxied: file.proxied,
            }))
    }
}
