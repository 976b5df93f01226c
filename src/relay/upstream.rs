//! Outbound HTTP client.
//!
//! Upstream responses are converted into axum responses with the body left
//! as a stream; nothing is buffered here. Error statuses are returned as
//! ordinary responses, only transport failures become `RelayError`.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Response};

use crate::config::RelayConfig;
use crate::relay::RelayError;

/// Thin wrapper over a pooled `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    /// Build a client from the timeout and proxy settings.
    pub fn from_config(config: &RelayConfig) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs));
        if !config.upstream.system_proxy {
            builder = builder.no_proxy();
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    /// `GET url` with the given request headers.
    pub async fn fetch(&self, url: &str, headers: HeaderMap) -> Result<Response<Body>, RelayError> {
        let response = self.http.get(url).headers(headers).send().await?;
        Ok(into_response(response))
    }

    /// `PUT url` streaming `body` unchanged.
    pub async fn put(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Body,
    ) -> Result<Response<Body>, RelayError> {
        let response = self
            .http
            .request(Method::PUT, url)
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await?;
        Ok(into_response(response))
    }
}

fn into_response(upstream: reqwest::Response) -> Response<Body> {
    let status = upstream.status();
    let headers = upstream.headers().clone();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
