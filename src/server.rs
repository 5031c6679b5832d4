//! Administrative HTTP server.
//!
//! Exposes the reindex trigger for scheduled jobs and webhooks. The
//! operation is destructive (it clears the remote index before writing), so
//! the endpoint requires a bearer token matching the `REINDEX_ADMIN_TOKEN`
//! environment variable.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/reindex` | Run a full reindex (authorized) |
//! | `GET`  | `/reindex` | 405 — reindexing is POST-only |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "unauthorized", "message": "missing bearer token" } }
//! ```
//!
//! Error codes: `unauthorized` (401), `method_not_allowed` (405),
//! `source_unavailable` (502), `remote_index` (502).

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::cms::ContentStore;
use crate::config::Config;
use crate::error::BridgeError;
use crate::index::SearchIndex;
use crate::reindex::reindex_all;

/// Shared state for the route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn ContentStore>,
    index: Arc<dyn SearchIndex>,
    admin_token: String,
    /// Serializes reindex runs on this server; the library function itself
    /// makes no concurrency guarantee.
    reindex_gate: Arc<tokio::sync::Mutex<()>>,
}

/// Start the administrative server on the configured bind address.
///
/// Fails fast if `REINDEX_ADMIN_TOKEN` is not set: an unauthenticated
/// reindex endpoint would let anyone clear the index.
pub async fn run_server(
    config: &Config,
    store: Arc<dyn ContentStore>,
    index: Arc<dyn SearchIndex>,
) -> anyhow::Result<()> {
    let admin_token = std::env::var("REINDEX_ADMIN_TOKEN")
        .map_err(|_| anyhow::anyhow!("REINDEX_ADMIN_TOKEN environment variable not set"))?;

    let state = AppState {
        store,
        index,
        admin_token,
        reindex_gate: Arc::new(tokio::sync::Mutex::new(())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/reindex", get(handle_reindex_get).post(handle_reindex))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("admin server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": { "code": code, "message": message }
    });
    (status, Json(body)).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn handle_reindex(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match bearer_token(&headers) {
        Some(token) if token == state.admin_token => {}
        Some(_) => {
            return error_response(StatusCode::UNAUTHORIZED, "unauthorized", "invalid token")
        }
        None => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing bearer token",
            )
        }
    }

    let _gate = state.reindex_gate.lock().await;

    match reindex_all(state.store.as_ref(), state.index.as_ref()).await {
        Ok(count) => Json(serde_json::json!({
            "message": "reindex complete",
            "indexed": count,
        }))
        .into_response(),
        Err(e) => {
            error!("reindex failed: {}", e);
            let code = match e {
                BridgeError::SourceUnavailable(_) => "source_unavailable",
                _ => "remote_index",
            };
            error_response(StatusCode::BAD_GATEWAY, code, &e.to_string())
        }
    }
}

async fn handle_reindex_get() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        "use POST to trigger a reindex",
    )
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
