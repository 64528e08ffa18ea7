//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, Uri},
    Router,
};
use git_cors_proxy::lifecycle::Shutdown;
use git_cors_proxy::{HttpServer, ProxyConfig};
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port.
pub async fn start_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Proxy config reaching the given local upstreams over plain HTTP.
pub fn proxy_config(upstreams: &[SocketAddr]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.insecure_origins = upstreams.iter().map(|a| a.to_string()).collect();
    config.upstream.use_system_proxy = false;
    config.upstream.connect_timeout_secs = 2;
    config
}

/// Run the proxy on an ephemeral port. Keep the returned `Shutdown` alive
/// for as long as the proxy should run.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Client that neither follows redirects nor uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Upstream handler describing what it received, one fact per line.
pub async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>")
            .to_string()
    };

    format!(
        "method={}\nuri={}\nuser-agent={}\ncontent-type={}\nauthorization={}\ncookie={}\nx-request-id={}\nbody={}",
        method,
        uri,
        header("user-agent"),
        header("content-type"),
        header("authorization"),
        header("cookie"),
        header("x-request-id"),
        String::from_utf8_lossy(&body),
    )
}
