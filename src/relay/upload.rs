//! Upload forwarding.

use axum::body::Body;
use axum::http::header::{HeaderValue, AUTHORIZATION};
use axum::http::{Request, Response};

use crate::relay::headers::{strip_hop_by_hop, upload_request_headers};
use crate::relay::selector::Relay;
use crate::relay::RelayError;

/// Content-replacing upload URL for `filename` inside `path`.
///
/// `base` and `path` arrive decoded and are escaped segment by segment, so a
/// `#` or `?` in a folder name stays part of the path. A trailing slash on
/// `base` is dropped so the root base "/" adds nothing; `path` gets a
/// trailing slash when missing. `filename` is escaped whole.
pub fn upload_url(graph: &str, base: &str, path: &str, filename: &str) -> String {
    let base = escape_segments(base.trim_end_matches('/'));
    let dir = escape_segments(path);
    let slash = if dir.ends_with('/') { "" } else { "/" };
    format!(
        "{}/me/drive/root:{}{}{}{}:/content",
        graph,
        base,
        dir,
        slash,
        urlencoding::encode(filename)
    )
}

fn escape_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl Relay {
    /// Stream `request`'s body to the storage API as `filename` under `path`.
    ///
    /// The credential is fetched first; if that fails nothing is sent. The
    /// upstream response is returned as received, minus hop-by-hop headers.
    pub async fn handle_upload(
        &self,
        request: Request<Body>,
        path: &str,
        filename: &str,
    ) -> Result<Response<Body>, RelayError> {
        let config = self.config.load_full();
        let url = upload_url(&config.api_endpoint.graph, &config.base, path, filename);

        let token = self.tokens.access_token().await?;

        let (parts, body) = request.into_parts();
        let mut headers = upload_request_headers(&parts.headers);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("bearer {}", token))?);

        tracing::info!(path = %path, filename = %filename, "Forwarding upload");
        let mut response = self.upstream.put(&url, headers, body).await?;
        strip_hop_by_hop(response.headers_mut());

        tracing::info!(status = %response.status(), "Upload forwarded");
        Ok(response)
    }
}
