//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (timeout, tracing)
//! - Match each request to a frontend
//! - Layer the frontend's header rewriter in front of the upstream call
//! - Swap in new frontends and service mapping on config reload

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::util::option_layer;
use tower::{service_fn, Layer, ServiceExt};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::middleware::headers::HeaderRewriteLayer;
use crate::observability::metrics;
use crate::routing::Router as FrontendRouter;
use crate::service_map::CowServiceMap;

type HttpClient = Client<HttpConnector, Body>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub frontends: Arc<ArcSwap<FrontendRouter>>,
    pub client: HttpClient,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    frontends: Arc<ArcSwap<FrontendRouter>>,
    service_map: Arc<CowServiceMap>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let service_map = Arc::new(CowServiceMap::from_entries(&config.service_mapping));
        let frontends = Arc::new(ArcSwap::from_pointee(FrontendRouter::from_config(
            &config.frontends,
            service_map.clone(),
        )));

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            frontends: frontends.clone(),
            client,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            frontends,
            service_map,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Every config received on `config_updates` replaces the frontends (and
    /// with them every rewrite plan) and the hostname service mapping.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            frontends = self.frontends.load().frontends().len(),
            "HTTP server starting"
        );

        let frontends = self.frontends.clone();
        let service_map = self.service_map.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(config) => apply_config(&config, &frontends, &service_map),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
            tracing::debug!("Config reload loop stopped");
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The shared hostname → service mapping read by every rewrite plan.
    pub fn service_map(&self) -> Arc<CowServiceMap> {
        self.service_map.clone()
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Replace the service mapping, then the frontends, from a reloaded config.
///
/// The two swaps are not atomic together: a request landing between them
/// resolves its hostname with the new mapping against the old frontend's
/// plan. Each lookup still sees one whole mapping. Listener and timeout
/// changes need a restart.
fn apply_config(
    config: &ProxyConfig,
    frontends: &ArcSwap<FrontendRouter>,
    service_map: &Arc<CowServiceMap>,
) {
    service_map.replace(&config.service_mapping);
    frontends.store(Arc::new(FrontendRouter::from_config(
        &config.frontends,
        service_map.clone(),
    )));
    tracing::info!(
        frontends = config.frontends.len(),
        services = config.service_mapping.len(),
        "Configuration reloaded"
    );
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let frontends = state.frontends.load_full();

    let Some(frontend) = frontends.match_request(&request) else {
        tracing::warn!(path = %request.uri().path(), "No frontend matched");
        metrics::record_request("none", 404, start);
        return (StatusCode::NOT_FOUND, "No matching frontend").into_response();
    };

    tracing::debug!(
        frontend = %frontend.name,
        method = %request.method(),
        path = %request.uri().path(),
        "Proxying request"
    );

    let client = state.client.clone();
    let backend = frontend.backend;
    let upstream = option_layer(frontend.rewriter.clone().map(HeaderRewriteLayer::new))
        .layer(service_fn(move |req: Request<Body>| forward(client.clone(), backend, req)))
        .oneshot(request)
        .await;

    let mut response = match upstream {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(frontend = %frontend.name, backend = %backend, error = %e, "Upstream error");
            metrics::record_request(&frontend.name, 502, start);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    if let Some(rewriter) = &frontend.rewriter {
        if let Err(e) = rewriter.modify_response_headers(&mut response) {
            tracing::error!(frontend = %frontend.name, error = %e, "Response header rewrite failed");
            metrics::record_request(&frontend.name, 502, start);
            return (StatusCode::BAD_GATEWAY, "Response rewrite failed").into_response();
        }
    }

    metrics::record_request(&frontend.name, response.status().as_u16(), start);
    response
}

/// Send `req` to `backend`, keeping path, query and headers.
async fn forward(
    client: HttpClient,
    backend: SocketAddr,
    req: Request<Body>,
) -> Result<Response, hyper_util::client::legacy::Error> {
    let (mut parts, body) = req.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    if let Ok(authority) = Authority::from_str(&backend.to_string()) {
        uri_parts.authority = Some(authority);
    }
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    if let Ok(uri) = Uri::from_parts(uri_parts) {
        parts.uri = uri;
    }

    let response = client.request(Request::from_parts(parts, body)).await?;
    Ok(response.map(Body::new))
}
