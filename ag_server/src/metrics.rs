//! Prometheus metrics for the authentication endpoints.
//!
//! Metrics are exposed in Prometheus text format on a separate listener when
//! `METRICS_BIND` is configured. Without an installed exporter the recording
//! functions are no-ops.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ag_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::login_total("success");
//! metrics::guard_rejections_total("login_protection", "blocked");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Guard Metrics
// ============================================================================

/// Increment the counter of requests a guard refused.
///
/// `guard` names the guard (`path_limit`, `login_protection`, `login_success`,
/// `register_protection`, `credential_gate`, `access_token`), `reason` the
/// rejection kind.
pub fn guard_rejections_total(guard: &'static str, reason: &'static str) {
    metrics::counter!("auth_guard_rejections_total",
        "guard" => guard,
        "reason" => reason
    )
    .increment(1);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter, labelled `success` or `failure`.
pub fn login_total(result: &'static str) {
    metrics::counter!("auth_login_total",
        "result" => result
    )
    .increment(1);
}

/// Increment issued tokens counter, labelled `access` or `refresh`.
pub fn tokens_issued_total(kind: &'static str) {
    metrics::counter!("auth_tokens_issued_total",
        "kind" => kind
    )
    .increment(1);
}
