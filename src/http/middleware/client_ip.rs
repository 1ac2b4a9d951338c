//! Client address middleware.
//!
//! Resolves the caller's address once per request and stores it in the
//! request extensions. Everything downstream (rate limiting, handlers,
//! access log) reads the stored [`ClientIp`] rather than the socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::client_ip::{ClientIp, ClientIpResolver};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;

pub async fn client_ip_middleware(
    State(resolver): State<Arc<ClientIpResolver>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    // Without connect info the peer is unknown; the resolver treats an
    // empty string as malformed and falls back to 0.0.0.0.
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();

    let client_ip = resolver.resolve(req.headers(), &remote_addr);
    metrics::record_resolution(client_ip.source());
    req.extensions_mut().insert(client_ip);

    let request_id = req.request_id().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    metrics::record_request(method.as_str(), status);
    tracing::debug!(
        request_id = %request_id,
        client_ip = %client_ip,
        source = client_ip.source().as_str(),
        remote_addr = %remote_addr,
        method = %method,
        path = %path,
        status,
        latency_ms = start_time.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClientIp>()
            .copied()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Client address not resolved"))
    }
}
