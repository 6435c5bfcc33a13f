//! Axum-based HTTP gateway.
//!
//! Exposes the four-endpoint surface consumed by the client shell:
//! - `POST /signup`, `POST /login` — auth service
//! - `POST /optimize` — completion proxy (caller-supplied bearer key)
//! - `GET /health` — liveness + engine version
//!
//! Every failure becomes a `{"detail": …}` JSON envelope with a mapped
//! status code; nothing panics across a request. Body limits and a
//! request timeout guard the server itself.

use crate::auth::{AuthError, AuthService, CredentialStore};
use crate::config::Config;
use crate::proxy::{CompletionProxy, ProxyError};
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (256KB) — code submissions are text.
pub const MAX_BODY_SIZE: usize = 262_144;

/// Request timeout — must outlast the upstream completion call.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Engine identifier reported by `/health`.
pub const ENGINE: &str = concat!("PyTurbo AI v", env!("CARGO_PKG_VERSION"));

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub proxy: Arc<CompletionProxy>,
}

// ── Error envelope ──────────────────────────────────────────────────

/// Gateway-boundary error: a status code plus a human-readable detail,
/// rendered as `{"detail": …}`.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UserExists => Self {
                status: StatusCode::BAD_REQUEST,
                detail: e.to_string(),
            },
            AuthError::InvalidCredentials => Self {
                status: StatusCode::UNAUTHORIZED,
                detail: e.to_string(),
            },
            AuthError::InvalidRequest(_) => Self {
                status: StatusCode::BAD_REQUEST,
                detail: e.to_string(),
            },
            AuthError::Store(inner) => {
                // Store internals stay out of the response body.
                tracing::error!("credential store failure: {inner}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    detail: "Internal server error".into(),
                }
            }
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(e: ProxyError) -> Self {
        let status = match e {
            ProxyError::MissingCredential => StatusCode::UNAUTHORIZED,
            ProxyError::EmptyInput | ProxyError::DomainRejected => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: e.to_string(),
        }
    }
}

// ── Request bodies ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct CredentialsBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct OptimizeBody {
    code: String,
    #[serde(default)]
    model: Option<String>,
}

/// Extract the provider key from the Authorization header. Accepts the
/// value with or without a `Bearer ` prefix.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /signup — create a user account.
async fn handle_signup(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.signup(&body.username, &body.password)?;
    tracing::info!(username = %body.username.trim(), "user registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "User created successfully" })),
    ))
}

/// POST /login — verify credentials.
async fn handle_login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let username = state.auth.login(&body.username, &body.password)?;
    tracing::info!(username = %username, "user authenticated");
    Ok(Json(serde_json::json!({
        "username": username,
        "status": "authenticated",
    })))
}

/// POST /optimize — forward code to the completion provider.
///
/// The caller supplies the provider key per request via the
/// Authorization header; it is never stored or logged.
async fn handle_optimize(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OptimizeBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let api_key = extract_bearer_token(&headers).ok_or(ProxyError::MissingCredential)?;

    let model = body.model.as_deref().unwrap_or_default();
    let result = state.proxy.optimize(api_key, model, &body.code).await?;

    Ok(Json(serde_json::json!({ "result": result })))
}

/// GET /health — always public.
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "active",
        "engine": ENGINE,
    }))
}

// ── Router / server ─────────────────────────────────────────────────

/// Build the gateway router over the given state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/signup", post(handle_signup))
        .route("/login", post(handle_login))
        .route("/optimize", post(handle_optimize))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
}

/// Open the credential store, build the router, and serve until
/// interrupted.
pub async fn run_gateway(config: &Config) -> Result<()> {
    let store = CredentialStore::open(&config.database.path)?;
    let state = AppState {
        auth: Arc::new(AuthService::new(store)),
        proxy: Arc::new(CompletionProxy::new(
            &config.upstream.base_url,
            config.upstream.timeout_secs,
        )),
    };

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
