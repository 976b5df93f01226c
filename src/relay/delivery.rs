//! Direct and proxied delivery.
//!
//! Direct delivery answers with a redirect and never touches the upstream.
//! Proxied delivery performs a range-aware fetch and streams the body back,
//! preserving the upstream status so 206 and 304 pass through untouched.

use axum::body::Body;
use axum::http::header::{HeaderMap, HeaderValue, LOCATION};
use axum::http::{request::Parts, Response, StatusCode};

use crate::observability::metrics;
use crate::relay::headers::{
    conditional_request_headers, project_headers, propagate_etag, tag_provider, Provider,
};
use crate::relay::upstream::UpstreamClient;
use crate::relay::RelayError;

/// Number of leading characters removed from a resolved URL before it is
/// exposed as a redirect target.
pub const SCHEME_MARKER_LEN: usize = 6;

/// How a file is handed to the client when it is not served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 302 to the file's real location.
    Direct,
    /// Stream the file through the relay.
    Proxied,
}

impl Delivery {
    pub fn for_target(proxied: bool) -> Self {
        if proxied {
            Delivery::Proxied
        } else {
            Delivery::Direct
        }
    }

    pub async fn deliver(
        self,
        upstream: &UpstreamClient,
        url: &str,
        request: &Parts,
    ) -> Result<Response<Body>, RelayError> {
        match self {
            Delivery::Direct => direct_delivery(url),
            Delivery::Proxied => proxied_delivery(upstream, url, request).await,
        }
    }
}

/// `url` without its leading scheme marker.
///
/// The marker is counted in Unicode scalar values, so a character outside
/// the Basic Multilingual Plane counts once. A URL with nothing left after
/// the marker is rejected instead of producing an empty `Location`.
pub fn redirect_location(url: &str) -> Result<&str, RelayError> {
    url.char_indices()
        .nth(SCHEME_MARKER_LEN)
        .map(|(start, _)| &url[start..])
        .ok_or_else(|| {
            RelayError::InvalidTarget(format!(
                "resolved URL {:?} has nothing after its {}-character marker",
                url, SCHEME_MARKER_LEN
            ))
        })
}

/// 302 to the resolved URL, marker stripped. No body.
pub fn direct_delivery(url: &str) -> Result<Response<Body>, RelayError> {
    let location = HeaderValue::from_str(redirect_location(url)?)?;
    tracing::debug!(location = ?location, "Direct download");
    metrics::record_delivery("directDownload");

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    response.headers_mut().insert(LOCATION, location);
    Ok(response)
}

/// Fetch `url` with the client's range/conditional headers and stream it back.
pub async fn proxied_delivery(
    upstream: &UpstreamClient,
    url: &str,
    request: &Parts,
) -> Result<Response<Body>, RelayError> {
    tracing::debug!("Proxied download");
    let forwarded = conditional_request_headers(&request.headers);
    let (parts, body) = upstream.fetch(url, forwarded).await?.into_parts();

    let mut headers = project_headers(&parts.headers);
    tag_provider(&mut headers, Provider::ProxiedDownload);
    propagate_etag(&parts.headers, &mut headers);

    metrics::record_delivery(Provider::ProxiedDownload.as_str());
    Ok(relay_response(parts.status, headers, body))
}

pub(crate) fn relay_response(status: StatusCode, headers: HeaderMap, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
