//! Upload credentials.
//!
//! The relay never acquires tokens itself. It asks a `TokenProvider` for an
//! opaque bearer credential right before each upload; if that fails the
//! upload is abandoned before anything is sent upstream.

use async_trait::async_trait;

use crate::relay::RelayError;

/// Source of bearer credentials for the storage API.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, RelayError>;
}

/// Reads the token from an environment variable on every call, so an
/// external refresher can rotate it without restarting the relay.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<String, RelayError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Ok(_) => Err(RelayError::Credential(format!("{} is empty", self.var))),
            Err(e) => Err(RelayError::Credential(format!("{}: {}", self.var, e))),
        }
    }
}

/// A fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider(pub String);

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, RelayError> {
        Ok(self.0.clone())
    }
}
