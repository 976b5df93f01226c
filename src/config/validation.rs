//! Configuration validation.
//!
//! Serde handles syntax; this module checks the semantics serde can't:
//! addresses parse, cache tiers are ordered, paths are absolute.
//! Every problem is reported, not just the first one.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("base `{0}` must be empty or start with '/'")]
    Base(String),

    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("observability.log_format `{0}` must be \"pretty\" or \"json\"")]
    LogFormat(String),

    #[error("cache.entire_file_cache_limit ({entire}) exceeds cache.chunked_cache_limit ({chunked})")]
    CacheLimits { entire: u64, chunked: u64 },

    #[error("cache path `{0}` must start with '/'")]
    CachePath(String),

    #[error("api_endpoint.graph `{0}` is not an absolute http(s) URL")]
    GraphEndpoint(String),

    #[error("files entry `{0}` must have a path starting with '/'")]
    FilePath(String),

    #[error("files entry `{0}` has an empty download_url")]
    FileUrl(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.base.is_empty() && !config.base.starts_with('/') {
        errors.push(ValidationError::Base(config.base.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(observability.log_format.clone()));
    }

    let cache = &config.cache;
    if cache.entire_file_cache_limit > cache.chunked_cache_limit {
        errors.push(ValidationError::CacheLimits {
            entire: cache.entire_file_cache_limit,
            chunked: cache.chunked_cache_limit,
        });
    }
    for path in cache.paths.iter().filter(|p| !p.starts_with('/')) {
        errors.push(ValidationError::CachePath(path.clone()));
    }

    match Url::parse(&config.api_endpoint.graph) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::GraphEndpoint(config.api_endpoint.graph.clone())),
    }

    for file in &config.files {
        if !file.path.starts_with('/') {
            errors.push(ValidationError::FilePath(file.path.clone()));
        }
        if file.download_url.is_empty() {
            errors.push(ValidationError::FileUrl(file.path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
