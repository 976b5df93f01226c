//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → request.rs (request ID, decoded path, upload filename)
//!     → GET/HEAD: cache hit? → resolver → Relay::handle_file
//!       PUT/POST ?upload=    → Relay::handle_upload
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
