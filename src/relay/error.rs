//! Relay error type.

use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use thiserror::Error;

/// Errors surfaced by delivery, caching and upload forwarding.
///
/// Upstream HTTP error statuses are not errors here; they are forwarded
/// as responses. Only failures with no response to forward end up here.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Network-level failure talking to the upstream.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The token provider could not produce a credential.
    #[error("credential unavailable: {0}")]
    Credential(String),

    /// A resolved URL that cannot be turned into a redirect.
    #[error("invalid resolved target: {0}")]
    InvalidTarget(String),

    /// Reading an upstream body failed.
    #[error("failed to read upstream body: {0}")]
    Body(String),

    /// The path resolver failed.
    #[error("failed to resolve path: {0}")]
    Resolve(String),

    /// A computed header value is not representable.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

impl RelayError {
    /// Status returned to the client when no upstream response exists.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Upstream(_) | RelayError::Body(_) | RelayError::Credential(_) => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::InvalidTarget(_) | RelayError::Resolve(_) | RelayError::InvalidHeader(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
