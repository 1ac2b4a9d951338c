//! Metrics collection and exposition.
//!
//! # Metrics
//! - `client_ip_resolutions_total` (counter): resolved requests by `source`
//!   (header, peer, unspecified)
//! - `rate_limited_total` (counter): rejected requests by `reason`
//! - `http_requests_total` (counter): served requests by method and status
//!
//! A rising `source="unspecified"` count means peers are arriving without a
//! usable transport address; check the listener setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::client_ip::IpSource;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_resolution(source: IpSource) {
    metrics::counter!("client_ip_resolutions_total", "source" => source.as_str()).increment(1);
}

pub fn record_rate_limited(reason: &'static str) {
    metrics::counter!("rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
