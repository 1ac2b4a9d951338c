//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use client_ip::{HttpServer, ServerConfig, Shutdown};
use tokio::net::TcpListener;

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server with `config` on 127.0.0.1 and an OS-assigned port.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    TestServer { addr, shutdown }
}

/// Client that never reuses connections or honours proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Config for a server behind proxies in `trusted`, reading `header`.
#[allow(dead_code)]
pub fn proxied_config(header: &str, trusted: &[&str]) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.client_ip.behind_proxy = true;
    config.client_ip.forwarded_header = header.to_string();
    config.client_ip.trusted_prefixes = trusted.iter().map(|p| p.parse().unwrap()).collect();
    config
}
