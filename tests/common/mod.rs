//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{request::Parts, HeaderMap, Method, Request, Response, StatusCode};
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;

use drive_relay::auth::{StaticTokenProvider, TokenProvider};
use drive_relay::config::RelayConfig;
use drive_relay::relay::{Relay, RelayError};
use drive_relay::store::{CacheError, CacheKey, CacheStore, MemoryCacheStore};

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> Response<Body> + Send + Sync>;

/// A programmable upstream on an ephemeral port that records every request.
pub struct MockUpstream {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Response<Body> + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Responder = Arc::new(responder);

        let recorded = Arc::clone(&requests);
        let app = Router::new().fallback(move |request: Request<Body>| {
            let recorded = Arc::clone(&recorded);
            let responder = Arc::clone(&responder);
            async move {
                let (parts, body) = request.into_parts();
                let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
                let request = RecordedRequest {
                    method: parts.method,
                    uri: parts.uri.to_string(),
                    headers: parts.headers,
                    body,
                };
                let response = responder(&request);
                recorded.lock().unwrap().push(request);
                response
            }
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    /// Serve `content` for every GET, honouring single `bytes=a-b` ranges.
    pub async fn serving(content: impl Into<Bytes>, etag: Option<&'static str>) -> Self {
        let content = content.into();
        Self::start(move |request| file_response(&content, etag, request)).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Build a response with the given status, body and headers.
pub fn respond(status: u16, body: impl Into<Bytes>, headers: &[(&'static str, &str)]) -> Response<Body> {
    let mut builder = Response::builder().status(status);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.into())).unwrap()
}

fn file_response(content: &Bytes, etag: Option<&str>, request: &RecordedRequest) -> Response<Body> {
    let mut headers: Vec<(&'static str, String)> = vec![
        ("content-type", "application/octet-stream".into()),
        ("accept-ranges", "bytes".into()),
        ("content-disposition", "attachment; filename=\"file.bin\"".into()),
        ("x-upstream-secret", "internal".into()),
        ("cache-control", "private".into()),
    ];
    if let Some(etag) = etag {
        headers.push(("etag", etag.into()));
    }

    let range = request
        .headers
        .get("range")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range);

    let (status, body) = match range {
        Some((start, end)) if start < content.len() => {
            let end = end.min(content.len() - 1);
            headers.push(("content-range", format!("bytes {}-{}/{}", start, end, content.len())));
            (StatusCode::PARTIAL_CONTENT, content.slice(start..=end))
        }
        _ => (StatusCode::OK, content.clone()),
    };

    let mut builder = Response::builder().status(status);
    for (name, value) in &headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(Body::from(body)).unwrap()
}

fn parse_range(value: &str) -> Option<(usize, usize)> {
    let range = value.strip_prefix("bytes=")?;
    let (start, end) = range.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// A config pointing uploads at `upstream`, caching paths under `/cached`.
pub fn test_config(upstream: &MockUpstream) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.base = String::new();
    config.upstream.system_proxy = false;
    config.api_endpoint.graph = upstream.url("/v1.0");
    config.cache.enable = true;
    config.cache.paths = vec!["/cached".into()];
    config.cache.entire_file_cache_limit = 1_000;
    config.cache.chunked_cache_limit = 1_000_000;
    config
}

pub fn relay_with(config: RelayConfig, store: Arc<dyn CacheStore>, tokens: Arc<dyn TokenProvider>) -> Relay {
    let shared = Arc::new(arc_swap::ArcSwap::from_pointee(config));
    Relay::new(shared, store, tokens).unwrap()
}

pub fn relay(config: RelayConfig, store: Arc<dyn CacheStore>) -> Relay {
    relay_with(config, store, Arc::new(StaticTokenProvider("test-token".into())))
}

/// Request head for `method uri` with the given headers.
pub fn parts(method: Method, uri: &str, headers: &[(&'static str, &str)]) -> Parts {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(()).unwrap().into_parts().0
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

/// A memory store that counts writes.
#[derive(Clone)]
pub struct RecordingStore {
    pub inner: MemoryCacheStore,
    puts: Arc<AtomicUsize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheStore::new(64),
            puts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn get(&self, key: &CacheKey) -> Option<Response<Body>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: CacheKey, response: Response<Body>) -> Result<(), CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, response).await
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// A store that rejects every write.
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &CacheKey) -> Option<Response<Body>> {
        None
    }

    async fn put(&self, key: CacheKey, _response: Response<Body>) -> Result<(), CacheError> {
        Err(CacheError::Body {
            key: key.to_string(),
            reason: "store offline".into(),
        })
    }

    fn len(&self) -> usize {
        0
    }
}

/// A token provider that always fails.
pub struct NoToken;

#[async_trait]
impl TokenProvider for NoToken {
    async fn access_token(&self) -> Result<String, RelayError> {
        Err(RelayError::Credential("token refresh failed".into()))
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
