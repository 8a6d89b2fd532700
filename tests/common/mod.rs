//! Shared utilities for integration tests.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use frontend_headers::config::ProxyConfig;
use frontend_headers::{CowServiceMap, HttpServer, Shutdown};

/// Start a backend that answers with the request headers it received as JSON.
///
/// Every response carries `server: mock-backend` and `x-backend: 1`.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(echo_headers);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn echo_headers(headers: HeaderMap) -> impl IntoResponse {
    let received: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();

    (
        [("server", "mock-backend"), ("x-backend", "1")],
        serde_json::to_string(&received).unwrap(),
    )
}

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub config_updates: mpsc::UnboundedSender<ProxyConfig>,
    pub service_map: Arc<CowServiceMap>,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub async fn start(config: ProxyConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let (config_updates, updates_rx) = mpsc::unbounded_channel();
        let server = HttpServer::new(config);
        let service_map = server.service_map();
        let server_shutdown = shutdown.subscribe();

        tokio::spawn(async move {
            let _ = server.run(listener, updates_rx, server_shutdown).await;
        });

        Self {
            addr,
            config_updates,
            service_map,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// What one request through the proxy looked like on both sides.
pub struct Exchange {
    pub status: reqwest::StatusCode,
    /// Response headers as the client received them.
    pub response_headers: reqwest::header::HeaderMap,
    /// Request headers as the backend received them.
    pub backend_saw: BTreeMap<String, String>,
}

/// Send a GET for `/` with the given Host header and extra headers.
pub async fn get_via(proxy: &TestProxy, host: &str, extra: &[(&str, &str)]) -> Exchange {
    let mut request = client().get(proxy.url("/")).header("host", host);
    for (name, value) in extra {
        request = request.header(*name, *value);
    }

    let response = request.send().await.expect("proxy unreachable");
    let status = response.status();
    let response_headers = response.headers().clone();
    let body = response.text().await.unwrap();

    Exchange {
        status,
        response_headers,
        backend_saw: serde_json::from_str(&body).unwrap_or_default(),
    }
}
