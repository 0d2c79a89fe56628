//! HTTP API of the authentication server.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: async web framework
//! - **Tower**: middleware for CORS, log IDs, sessions and guards
//! - **authguard**: tokens, sessions and the abuse guards, all sharing one
//!   counter store
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                          - Health check (public)
//! POST /api/v1/user/register            - Register (registration cooldown)
//! POST /api/v1/user/login               - Login (brute-force guard, success throttle)
//! POST /api/v1/user/refresh_token       - Rotate tokens (session + refresh cookie)
//! POST /api/v1/user/logout              - Logout (access token)
//! GET  /api/v1/user/info                - Profile (access token, credential gate)
//! POST /api/v1/user/update_info         - Change name (access token, credential gate)
//! POST /api/v1/user/update_password     - Change password (access token, credential gate)
//! ```
//!
//! Every `/api/v1` request first has its session cookie resolved and is then
//! counted by the per-path rate limiter.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ag_server::{api::{AppState, create_router}, config::AuthSettings};
//! use authguard::{
//!     config::TokenConfig,
//!     credential::MemoryCredentialRepository,
//!     digest::Sha256Digest,
//!     store::MemoryCounterStore,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = AuthSettings::new(TokenConfig::new("a".repeat(32), "r".repeat(32)));
//! let state = AppState::new(
//!     Arc::new(MemoryCounterStore::new()),
//!     Arc::new(MemoryCredentialRepository::new()),
//!     Arc::new(Sha256Digest),
//!     &settings,
//! );
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod cookies;
pub mod dto;
pub mod extract;
pub mod guards;
pub mod handlers;
pub mod middleware;
pub mod request_id;
pub mod response;
pub mod session;

use crate::config::AuthSettings;
use authguard::{
    auth::{SessionStore, TokenLifecycle},
    credential::{AccountService, CredentialRepository},
    digest::PasswordDigest,
    security::{CredentialGate, LoginGuard, LoginSuccessThrottle, PathRateLimiter, RegisterGuard},
    store::CounterStore,
};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Built once at startup; cloning only bumps the `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CounterStore>,
    pub accounts: Arc<AccountService>,
    pub sessions: Arc<SessionStore>,
    pub tokens: Arc<TokenLifecycle>,
    pub login_guard: Arc<LoginGuard>,
    pub success_throttle: Arc<LoginSuccessThrottle>,
    pub register_guard: Arc<RegisterGuard>,
    pub credential_gate: Arc<CredentialGate>,
    pub path_limiter: Arc<PathRateLimiter>,
}

impl AppState {
    /// Wire every component onto one counter store and one account repository
    pub fn new(
        store: Arc<dyn CounterStore>,
        repository: Arc<dyn CredentialRepository>,
        digest: Arc<dyn PasswordDigest>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(repository.clone(), digest)),
            sessions: Arc::new(SessionStore::new(store.clone(), settings.session.clone())),
            tokens: Arc::new(TokenLifecycle::new(store.clone(), settings.tokens.clone())),
            login_guard: Arc::new(LoginGuard::new(store.clone(), settings.login.clone())),
            success_throttle: Arc::new(LoginSuccessThrottle::new(store.clone(), &settings.login)),
            register_guard: Arc::new(RegisterGuard::new(store.clone(), settings.register.clone())),
            credential_gate: Arc::new(CredentialGate::new(repository, settings.gate.clone())),
            path_limiter: Arc::new(PathRateLimiter::new(store.clone(), &settings.rate_rules)),
            store,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .nest("/user", create_user_router(state.clone()))
        .layer(from_fn_with_state(
            state.clone(),
            guards::path_limit_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::log_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// User routes, each wrapped in the guards it needs.
///
/// Layers added last run first: on login the IP block is checked before the
/// account throttle, and on protected routes the access token before the
/// credential gate.
fn create_user_router(state: AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/register", post(handlers::register))
        .layer(from_fn_with_state(
            state.clone(),
            guards::register_protection_middleware,
        ));

    let login = Router::new()
        .route("/login", post(handlers::login))
        .layer(from_fn_with_state(
            state.clone(),
            guards::login_success_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            guards::login_protection_middleware,
        ));

    let refresh = Router::new().route("/refresh_token", post(handlers::refresh_token));

    let logout = Router::new()
        .route("/logout", post(handlers::logout))
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    let account = Router::new()
        .route("/info", get(handlers::info))
        .route("/update_info", post(handlers::update_info))
        .route("/update_password", post(handlers::update_password))
        .layer(from_fn_with_state(
            state.clone(),
            guards::credential_gate_middleware,
        ))
        .layer(from_fn_with_state(state, middleware::auth_middleware));

    Router::new()
        .merge(register)
        .merge(login)
        .merge(refresh)
        .merge(logout)
        .merge(account)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the counter store answers, `503 Service
/// Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","store":true,"version":"0.1.0","timestamp":"2026-10-16T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.store.exists("health_probe").await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Health check store probe failed: {}", e);
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
