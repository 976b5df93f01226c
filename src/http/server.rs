//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (tracing, request ID, timeout)
//! - Serve cache hits for cache-eligible paths
//! - Resolve paths and hand files to the relay
//! - Forward `?upload=` requests to the upload path
//! - Swap in reloaded configuration while running

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header::RANGE, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::EnvTokenProvider;
use crate::config::RelayConfig;
use crate::http::request::{decoded_path, request_id, upload_filename, X_REQUEST_ID};
use crate::lifecycle::shutdown::wait_for;
use crate::observability::metrics;
use crate::relay::{Relay, RelayError};
use crate::resolve::{StaticResolver, TargetResolver};
use crate::store::{CacheKey, CacheStore, MemoryCacheStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    pub resolver: Arc<dyn TargetResolver>,
}

/// HTTP front end of the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ArcSwap<RelayConfig>>,
}

impl HttpServer {
    /// Build a server with the in-memory store, environment credentials and
    /// the `[[files]]` resolver.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(config.cache.max_entries));
        let tokens = Arc::new(EnvTokenProvider::new(config.auth.token_env.clone()));
        let shared = Arc::new(ArcSwap::from_pointee(config));
        let resolver = Arc::new(StaticResolver::new(Arc::clone(&shared)));
        let relay = Arc::new(Relay::new(shared, store, tokens)?);
        Ok(Self::from_state(AppState { relay, resolver }))
    }

    /// Build a server around already-constructed collaborators.
    pub fn from_state(state: AppState) -> Self {
        let config = Arc::clone(&state.relay.config);
        let router = Self::build_router(&config.load(), state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout covers downloads only. An upload's handler is
    /// still streaming the client body upstream, so timing it out would cut
    /// the transfer short.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        // `get` also answers HEAD.
        let timeout = Duration::from_secs(config.timeouts.request_secs);
        let downloads = get(download_handler).layer(TimeoutLayer::new(timeout));
        let files = downloads.merge(put(upload_handler).post(upload_handler));

        Router::new()
            .route("/_relay/health", get(health_handler))
            .route("/{*path}", files.clone())
            .route("/", files)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// The router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Live configuration shared with the relay and resolver.
    pub fn config(&self) -> &Arc<ArcSwap<RelayConfig>> {
        &self.config
    }

    /// Accept connections until `shutdown` fires, applying every config
    /// received on `config_updates` as it arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live = Arc::clone(&self.config);
        let reloads = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                let fixed = restart_required(&live.load_full(), &new_config);
                if !fixed.is_empty() {
                    tracing::warn!(
                        settings = ?fixed,
                        "Reloaded settings only take effect after a restart"
                    );
                }
                tracing::info!(
                    files = new_config.files.len(),
                    cache_enabled = new_config.cache.enable,
                    "Applying reloaded configuration"
                );
                live.store(Arc::new(new_config));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                wait_for(shutdown).await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        reloads.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Settings that differ between `current` and `next` but are only read when
/// the server is built.
fn restart_required(current: &RelayConfig, next: &RelayConfig) -> Vec<&'static str> {
    let mut fixed = Vec::new();
    if current.listener.bind_address != next.listener.bind_address {
        fixed.push("listener.bind_address");
    }
    if current.timeouts != next.timeouts {
        fixed.push("timeouts");
    }
    if current.upstream != next.upstream {
        fixed.push("upstream");
    }
    if current.cache.max_entries != next.cache.max_entries {
        fixed.push("cache.max_entries");
    }
    if current.auth.token_env != next.auth.token_env {
        fixed.push("auth.token_env");
    }
    fixed
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    cache_entries: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache_entries: state.relay.store().len(),
    })
}

/// File reads. Other methods on file paths get 405 from the method router.
async fn download_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let request_id = request_id(request.headers()).to_string();
    let path = decoded_path(request.uri());

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Relaying download");
    let result = serve_file(&state, request, &path).await;
    finish(result, &method, &request_id, &path, start)
}

/// `?upload=` writes.
async fn upload_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let request_id = request_id(request.headers()).to_string();
    let path = decoded_path(request.uri());

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Relaying upload");
    let result = serve_upload(&state, request, &path).await;
    finish(result, &method, &request_id, &path, start)
}

fn finish(
    result: Result<Response, RelayError>,
    method: &Method,
    request_id: &str,
    path: &str,
    start: Instant,
) -> Response {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            let status = e.status_code();
            tracing::error!(request_id = %request_id, path = %path, error = %e, status = %status, "Relay failed");
            error_response(status)
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn serve_file(state: &AppState, request: Request<Body>, path: &str) -> Result<Response, RelayError> {
    let (parts, _body) = request.into_parts();

    let config = state.relay.config();
    if parts.method == Method::GET && !parts.headers.contains_key(RANGE) && config.cache.is_eligible(path) {
        let key = CacheKey::from_request(&parts);
        let hit = state.relay.store().get(&key).await;
        metrics::record_cache_lookup(hit.is_some());
        if let Some(response) = hit {
            tracing::debug!(key = %key, "Serving from cache");
            return Ok(response);
        }
    }

    let Some(target) = state.resolver.resolve(path).await? else {
        tracing::debug!(path = %path, "No file at path");
        return Ok(error_response(StatusCode::NOT_FOUND));
    };

    state.relay.handle_file(&parts, path, &target).await
}

async fn serve_upload(state: &AppState, request: Request<Body>, path: &str) -> Result<Response, RelayError> {
    match upload_filename(request.uri()) {
        Some(filename) => state.relay.handle_upload(request, path, &filename).await,
        None => Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    }
}

fn error_response(status: StatusCode) -> Response {
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}
