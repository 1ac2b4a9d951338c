//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, client IP, rate limit)
//! - Bind server to listener with connection info
//! - Graceful shutdown on Ctrl+C or the lifecycle broadcast

use axum::{
    body::Body,
    extract::Query,
    http::{header, HeaderMap, Request},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::client_ip::{ClientIp, ClientIpResolver};
use crate::config::ServerConfig;
use crate::http::middleware::client_ip_middleware;
use crate::http::params::{read_bool_param, read_param};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};

/// How often idle rate-limit buckets are swept, and how long they may idle.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);
const BUCKET_MAX_IDLE: Duration = Duration::from_secs(300);

/// HTTP server reporting each caller's resolved address.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self, header::InvalidHeaderName> {
        let resolver = Arc::new(ClientIpResolver::from_config(&config.client_ip)?);

        if config.client_ip.behind_proxy && !resolver.uses_header() {
            tracing::warn!("client_ip.behind_proxy is set but forwarded_header is empty; using peer addresses");
        }
        tracing::info!(
            behind_proxy = config.client_ip.behind_proxy,
            forwarded_header = %config.client_ip.forwarded_header,
            trusted_prefixes = ?resolver.trusted().prefixes(),
            "Client IP resolution configured"
        );

        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.rate_limit)));

        let router = Self::build_router(&config, resolver, rate_limiter.clone());
        Ok(Self {
            router,
            config,
            rate_limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &ServerConfig,
        resolver: Arc<ClientIpResolver>,
        rate_limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let mut router = Router::new()
            .route("/ip", get(ip_handler))
            .route("/health", get(health_handler));

        // Layers added later run earlier: the limiter needs the client IP
        if let Some(limiter) = rate_limiter {
            router = router.layer(from_fn_with_state(limiter, rate_limit_middleware));
        }

        router
            .layer(from_fn_with_state(resolver, client_ip_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %req.request_id(),
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The router without a listener, for driving requests in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let pruner = self.rate_limiter.clone().map(|limiter| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PRUNE_INTERVAL);
                loop {
                    interval.tick().await;
                    limiter.prune(BUCKET_MAX_IDLE);
                    tracing::trace!(clients = limiter.tracked_clients(), "Pruned rate limit buckets");
                }
            })
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        if let Some(pruner) = pruner {
            pruner.abort();
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Report the caller's resolved address.
///
/// `format=text` (or `x-format: text`) returns the bare address;
/// `pretty=1` indents the JSON.
async fn ip_handler(
    client_ip: ClientIp,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let format = read_param(&headers, &query, &["x-format", "format"]);
    if format.eq_ignore_ascii_case("text") {
        return format!("{client_ip}\n").into_response();
    }

    if read_bool_param(&headers, &query, false, &["x-pretty", "pretty"]) {
        match serde_json::to_string_pretty(&client_ip) {
            Ok(text) => ([(header::CONTENT_TYPE, "application/json")], text).into_response(),
            Err(_) => Json(client_ip).into_response(),
        }
    } else {
        Json(client_ip).into_response()
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Wait for Ctrl+C or an in-process shutdown trigger.
async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    // A dropped coordinator means nobody can trigger us in-process
    let triggered = async move {
        if let Err(broadcast::error::RecvError::Closed) = shutdown.recv().await {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = triggered => {}
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn proxied_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.client_ip.behind_proxy = true;
        config.client_ip.forwarded_header = "X-Forwarded-For".into();
        config.client_ip.trusted_prefixes = vec!["9.10.11.0/24".parse().unwrap()];
        config
    }

    #[tokio::test]
    async fn test_ip_from_header() {
        let server = HttpServer::new(proxied_config()).unwrap();
        let req = Request::builder()
            .uri("/ip")
            .header("x-forwarded-for", "1.2.3.4, 5.6.7.8, 9.10.11.12")
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.contains_key("x-request-id"));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["ip"], "5.6.7.8");
        assert_eq!(json["source"], "header");
    }

    #[tokio::test]
    async fn test_no_connect_info_resolves_unspecified() {
        let server = HttpServer::new(ServerConfig::default()).unwrap();
        let req = Request::builder()
            .uri("/ip?format=text")
            .body(Body::empty())
            .unwrap();

        let (status, _, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "0.0.0.0\n");
    }

    #[tokio::test]
    async fn test_connect_info_used_when_header_trusted() {
        let server = HttpServer::new(proxied_config()).unwrap();
        let mut req = Request::builder()
            .uri("/ip?format=text")
            .header("x-forwarded-for", "9.10.11.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(axum::extract::ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 4000))));

        let (_, _, body) = send(server.router(), req).await;
        assert_eq!(body, "192.0.2.10\n");
    }

    #[tokio::test]
    async fn test_request_id_preserved() {
        let server = HttpServer::new(ServerConfig::default()).unwrap();
        let req = Request::builder()
            .uri("/health")
            .header("x-request-id", "upstream-42")
            .body(Body::empty())
            .unwrap();

        let (status, headers, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
        assert_eq!(headers["x-request-id"], "upstream-42");
    }

    #[tokio::test]
    async fn test_rate_limit_by_resolved_address() {
        let mut config = proxied_config();
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst_size = 1;
        let server = HttpServer::new(config).unwrap();

        let request = |client: &str| {
            Request::builder()
                .uri("/health")
                .header("x-forwarded-for", client)
                .body(Body::empty())
                .unwrap()
        };

        let (first, _, _) = send(server.router(), request("203.0.113.1")).await;
        let (second, _, _) = send(server.router(), request("203.0.113.1")).await;
        let (other, _, _) = send(server.router(), request("203.0.113.2")).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(other, StatusCode::OK);
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let mut config = ServerConfig::default();
        config.client_ip.forwarded_header = "bad header".into();
        assert!(HttpServer::new(config).is_err());
    }
}
