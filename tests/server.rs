//! End-to-end requests through the router.

mod common;

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use futures_util::stream;
use serde_json::Value;
use tower::ServiceExt;

use common::{body_bytes, respond, test_config, MockUpstream, RecordingStore};
use drive_relay::auth::StaticTokenProvider;
use drive_relay::config::{FileEntry, RelayConfig};
use drive_relay::http::{AppState, HttpServer, X_REQUEST_ID};
use drive_relay::relay::{Relay, X_PROVIDER};
use drive_relay::resolve::StaticResolver;

fn server(config: RelayConfig, store: RecordingStore) -> HttpServer {
    let shared = Arc::new(ArcSwap::from_pointee(config));
    let relay = Relay::new(
        Arc::clone(&shared),
        Arc::new(store),
        Arc::new(StaticTokenProvider("server-token".into())),
    )
    .unwrap();
    HttpServer::from_state(AppState {
        relay: Arc::new(relay),
        resolver: Arc::new(StaticResolver::new(shared)),
    })
}

fn file(path: &str, url: String, size: u64, proxied: bool) -> FileEntry {
    FileEntry {
        path: path.into(),
        download_url: url,
        size,
        proxied,
    }
}

async fn send(router: &Router, request: Request<Body>) -> axum::response::Response {
    router.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let upstream = MockUpstream::serving("data", None).await;
    let router = server(test_config(&upstream), RecordingStore::new()).router();

    let response = send(&router, get("/nothing/here.txt")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(X_REQUEST_ID).is_some());
}

#[tokio::test]
async fn test_second_request_served_from_cache() {
    let upstream = MockUpstream::serving("cached body", Some("\"e1\"")).await;
    let mut config = test_config(&upstream);
    config.files.push(file("/cached/a.txt", upstream.url("/files/a.txt"), 11, false));
    let store = RecordingStore::new();
    let router = server(config, store.clone()).router();

    let first = send(&router, get("/cached/a.txt")).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[X_PROVIDER], "fullCache");
    assert_eq!(body_bytes(first).await, "cached body");

    let second = send(&router, get("/cached/a.txt")).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers()[X_PROVIDER], "fullCache");
    assert_eq!(body_bytes(second).await, "cached body");

    assert_eq!(upstream.hits(), 1);
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn test_range_request_skips_cache_lookup() {
    let upstream = MockUpstream::serving("0123456789", None).await;
    let mut config = test_config(&upstream);
    config.files.push(file("/cached/n.txt", upstream.url("/files/n.txt"), 10, true));
    let store = RecordingStore::new();
    let router = server(config, store.clone()).router();

    send(&router, get("/cached/n.txt")).await;
    assert_eq!(upstream.hits(), 1);

    let ranged = Request::builder()
        .uri("/cached/n.txt")
        .header("range", "bytes=0-3")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, ranged).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, "0123");
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn test_percent_encoded_path_resolves() {
    let upstream = MockUpstream::serving("data", None).await;
    let mut config = test_config(&upstream);
    config.files.push(file("/docs/my file.txt", upstream.url("/files/x"), 4, true));
    let router = server(config, RecordingStore::new()).router();

    let response = send(&router, get("/docs/my%20file.txt")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[X_PROVIDER], "proxiedDownload");
}

#[tokio::test]
async fn test_direct_redirect_through_router() {
    let upstream = MockUpstream::serving("data", None).await;
    let mut config = test_config(&upstream);
    config.files.push(file("/docs/a.txt", "proxy:https://cdn.example.com/a.txt".into(), 4, false));
    let router = server(config, RecordingStore::new()).router();

    let response = send(&router, get("/docs/a.txt")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], "https://cdn.example.com/a.txt");
}

#[tokio::test]
async fn test_invalid_target_is_internal_error() {
    let upstream = MockUpstream::serving("data", None).await;
    let mut config = test_config(&upstream);
    config.files.push(file("/docs/bad.txt", "short".into(), 4, false));
    let router = server(config, RecordingStore::new()).router();

    let response = send(&router, get("/docs/bad.txt")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_upload_route() {
    let upstream = MockUpstream::start(|_| respond(201, "{}", &[])).await;
    let router = server(test_config(&upstream), RecordingStore::new()).router();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/docs?upload=report%201.pdf")
        .body(Body::from("pdf bytes"))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let seen = upstream.requests();
    assert_eq!(seen[0].uri, "/v1.0/me/drive/root:/docs/report%201.pdf:/content");
    assert_eq!(seen[0].headers["authorization"], "bearer server-token");
    assert_eq!(seen[0].body, "pdf bytes");
}

#[tokio::test]
async fn test_upload_into_folder_with_reserved_characters() {
    let upstream = MockUpstream::start(|_| respond(201, "{}", &[])).await;
    let router = server(test_config(&upstream), RecordingStore::new()).router();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/Issue%20%231?upload=a.txt")
        .body(Body::from("notes"))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].uri, "/v1.0/me/drive/root:/Issue%20%231/a.txt:/content");
    assert_eq!(seen[0].body, "notes");
}

#[tokio::test]
async fn test_slow_upload_outlives_request_timeout() {
    let upstream = MockUpstream::start(|_| respond(201, "{}", &[])).await;
    let mut config = test_config(&upstream);
    config.timeouts.request_secs = 1;
    let router = server(config, RecordingStore::new()).router();

    let chunks = stream::unfold(0u8, |step| async move {
        match step {
            0 => Some((Ok::<_, std::io::Error>(Bytes::from_static(b"first half, ")), 1)),
            1 => {
                tokio::time::sleep(Duration::from_millis(1_500)).await;
                Some((Ok(Bytes::from_static(b"second half")), 2))
            }
            _ => None,
        }
    });
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/docs?upload=slow.bin")
        .body(Body::from_stream(chunks))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let seen = upstream.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].body, "first half, second half");
}

#[tokio::test]
async fn test_unsupported_methods() {
    let upstream = MockUpstream::serving("data", None).await;
    let router = server(test_config(&upstream), RecordingStore::new()).router();

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri("/docs/a.txt")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, delete).await.status(), StatusCode::METHOD_NOT_ALLOWED);

    let put_without_filename = Request::builder()
        .method(Method::PUT)
        .uri("/docs")
        .body(Body::from("x"))
        .unwrap();
    assert_eq!(send(&router, put_without_filename).await.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_health_reports_cache_entries() {
    let upstream = MockUpstream::serving("tiny", None).await;
    let mut config = test_config(&upstream);
    config.files.push(file("/cached/t.txt", upstream.url("/files/t.txt"), 4, true));
    let router = server(config, RecordingStore::new()).router();

    send(&router, get("/cached/t.txt")).await;

    let response = send(&router, get("/_relay/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["cache_entries"], 1);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let upstream = MockUpstream::serving("data", None).await;
    let router = server(test_config(&upstream), RecordingStore::new()).router();

    let request = Request::builder()
        .uri("/_relay/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.headers()[X_REQUEST_ID], "trace-me");
}
