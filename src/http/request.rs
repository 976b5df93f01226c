//! Request identification and inbound request helpers.
//!
//! Request IDs are assigned by tower-http's request-id layers before any
//! handler runs and echoed back on the response.

use axum::extract::Query;
use axum::http::{HeaderMap, HeaderName, Uri};
use serde::Deserialize;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// The request ID assigned by the middleware, or "unknown" outside it.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Percent-decoded request path.
///
/// Falls back to the raw path when the escapes don't decode to UTF-8.
pub fn decoded_path(uri: &Uri) -> String {
    let raw = uri.path();
    match urlencoding::decode(raw) {
        Ok(path) => path.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    upload: Option<String>,
}

/// The `upload` query parameter, if present and non-empty.
pub fn upload_filename(uri: &Uri) -> Option<String> {
    Query::<UploadQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.upload)
        .filter(|name| !name.is_empty())
}
