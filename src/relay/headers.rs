//! Header projection and forwarding rules.
//!
//! Responses built by the relay never mirror upstream headers wholesale.
//! Only an allow-list is projected, each header copied only when the
//! source carries it, then a provenance tag is attached.

use axum::http::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_RANGES, AUTHORIZATION, CONNECTION,
    CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, HOST, IF_MATCH,
    IF_MODIFIED_SINCE, IF_RANGE, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, RANGE, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};

/// Provenance header naming the strategy that produced a response.
pub const X_PROVIDER: &str = "x-provider";

/// Response headers copied from upstream onto relay responses.
pub const PROJECTED_HEADERS: [HeaderName; 5] = [
    CONTENT_TYPE,
    CONTENT_LENGTH,
    CONTENT_DISPOSITION,
    ACCEPT_RANGES,
    CONTENT_RANGE,
];

/// Client request headers forwarded on proxied fetches.
pub const CONDITIONAL_HEADERS: [HeaderName; 4] = [RANGE, IF_MATCH, IF_MODIFIED_SINCE, IF_RANGE];

const KEEP_ALIVE: &str = "keep-alive";

/// Which delivery strategy produced a streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    FullCache,
    ChunkCache,
    ProxiedDownload,
}

impl Provider {
    /// Wire value of the `x-provider` header.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::FullCache => "fullCache",
            Provider::ChunkCache => "chunkCache",
            Provider::ProxiedDownload => "proxiedDownload",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn copy_present(source: &HeaderMap, target: &mut HeaderMap, names: &[HeaderName]) {
    for name in names {
        for value in source.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}

/// Copy the allow-listed response headers present on `source`.
pub fn project_headers(source: &HeaderMap) -> HeaderMap {
    let mut projected = HeaderMap::new();
    copy_present(source, &mut projected, &PROJECTED_HEADERS);
    projected
}

/// Attach the provenance tag.
pub fn tag_provider(headers: &mut HeaderMap, provider: Provider) {
    headers.insert(X_PROVIDER, HeaderValue::from_static(provider.as_str()));
}

/// Copy the upstream `ETag` verbatim. An absent ETag stays absent.
pub fn propagate_etag(source: &HeaderMap, target: &mut HeaderMap) {
    if let Some(etag) = source.get(ETAG) {
        target.insert(ETAG, etag.clone());
    }
}

/// Range and conditional headers from the client request, for a proxied fetch.
pub fn conditional_request_headers(client: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    copy_present(client, &mut forwarded, &CONDITIONAL_HEADERS);
    forwarded
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }

    for name in [
        CONNECTION,
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
    ] {
        headers.remove(name);
    }
    headers.remove(KEEP_ALIVE);
}

/// Client headers that travel with a forwarded upload.
///
/// `Host` is derived from the target URL and `Authorization` is always
/// replaced by the relay's own credential.
pub fn upload_request_headers(client: &HeaderMap) -> HeaderMap {
    let mut headers = client.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(HOST);
    headers.remove(AUTHORIZATION);
    headers
}
