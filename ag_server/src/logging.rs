//! Structured logging configuration.
//!
//! The `authguard` library logs through the `log` facade; the subscriber
//! installed here also receives those records, so guard and token events end
//! up in the same stream as the request logs.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info` with noisy dependencies turned down.
///
/// # Example
///
/// ```no_run
/// use ag_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `ip_address` - Client address the event is attributed to
/// * `account` - Account involved, if known
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use ag_server::logging::log_security_event;
///
/// log_security_event(
///     "login_blocked",
///     "192.168.1.1",
///     Some("alice"),
///     "Too many login failures"
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    ip_address: &str,
    account: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        ip_address = ip_address,
        account = account,
        "SECURITY: {}",
        message
    );
}
