//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Storage base path that uploads are rooted under (e.g., "/Public").
    pub base: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Outbound HTTP client settings.
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Cache tiers and cache-eligible paths.
    pub cache: CacheConfig,

    /// Backing storage API endpoints.
    pub api_endpoint: ApiEndpointConfig,

    /// Credential source for uploads.
    pub auth: AuthConfig,

    /// Statically resolved files served by the relay.
    pub files: Vec<FileEntry>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base: "/".to_string(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            upstream: UpstreamConfig::default(),
            observability: ObservabilityConfig::default(),
            cache: CacheConfig::default(),
            api_endpoint: ApiEndpointConfig::default(),
            auth: AuthConfig::default(),
            files: Vec::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time a download has to produce response headers, in seconds.
    /// Body streaming is not bounded by this, and uploads are exempt.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 30,
        }
    }
}

/// Outbound client configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Honour HTTP(S)_PROXY environment variables for upstream requests.
    pub system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self { system_proxy: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch for caching.
    pub enable: bool,

    /// Files strictly smaller than this (bytes) are buffered and cached whole.
    pub entire_file_cache_limit: u64,

    /// Files strictly smaller than this (bytes) are streamed and cached through a tee.
    pub chunked_cache_limit: u64,

    /// Request path prefixes subject to caching.
    pub paths: Vec<String>,

    /// Maximum number of entries held by the in-memory store.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: false,
            entire_file_cache_limit: 10_000_000,
            chunked_cache_limit: 100_000_000,
            paths: Vec::new(),
            max_entries: 1024,
        }
    }
}

impl CacheConfig {
    /// Returns true if caching is on and `path` starts with a configured prefix.
    pub fn is_eligible(&self, path: &str) -> bool {
        self.enable && self.paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Backing storage API endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiEndpointConfig {
    /// Graph API root (no trailing slash).
    pub graph: String,
}

impl Default for ApiEndpointConfig {
    fn default() -> Self {
        Self {
            graph: "https://graph.microsoft.com/v1.0".to_string(),
        }
    }
}

/// Upload credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Environment variable holding the bearer access token.
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: "DRIVE_RELAY_ACCESS_TOKEN".to_string(),
        }
    }
}

/// A file whose download location is known ahead of time.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FileEntry {
    /// Request path the file is served under (decoded, starting with '/').
    pub path: String,

    /// Resolved upstream download URL.
    pub download_url: String,

    /// File size in bytes.
    #[serde(default)]
    pub size: u64,

    /// Stream through the relay instead of redirecting.
    #[serde(default)]
    pub proxied: bool,
}
