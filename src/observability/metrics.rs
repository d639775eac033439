//! Metrics collection and exposition.
//!
//! # Metrics
//! - `control_plane_requests_total` (counter): requests by route, status
//! - `control_plane_request_duration_seconds` (histogram): latency distribution
//! - `control_plane_restarts_total` (counter): server instances started
//!
//! # Design Decisions
//! - Recording is always on; exposition only when the exporter is installed
//! - Route label is the matched route template, never the raw path

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(route: &str, status: u16, start: Instant) {
    let route = route.to_string();
    let status = status.to_string();
    metrics::counter!(
        "control_plane_requests_total",
        "route" => route.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "control_plane_request_duration_seconds",
        "route" => route,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_restart(port: u16) {
    metrics::counter!("control_plane_restarts_total", "port" => port.to_string()).increment(1);
}

/// Middleware recording every request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_request(&route, response.status().as_u16(), start);
    response
}
