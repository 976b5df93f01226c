//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! relay.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc<ArcSwap<RelayConfig>> with the relay and resolver
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the live config atomically
//! ```
//!
//! Every field has a default so a near-empty file is a working config.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ApiEndpointConfig, AuthConfig, CacheConfig, FileEntry, ListenerConfig, ObservabilityConfig,
    RelayConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::ValidationError;
