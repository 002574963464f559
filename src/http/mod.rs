//! HTTP surface for both chat subsystems.
//!
//! ## URL layout
//!
//! ```text
//! Canned subsystem (also mounted under /api):
//! POST /chat/message
//! GET  /chat/history/{session_id}
//! POST /chat/new-session
//! GET  /chat/sessions
//! GET  /contact
//! GET  /api/                   → service banner
//!
//! Retrieval subsystem:
//! GET  /                       → service banner
//! GET  /health
//! POST /chat
//! GET  /info
//! GET  /conversation/suggest
//! GET  /debug/graph-status
//! ```

mod canned;
mod rag;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::canned::ContactInfo;
use crate::config::ProfileConfig;
use crate::error::AppError;
use crate::ledger::SessionLedger;
use crate::rag::RagEngine;

/// Router state injected into every handler.
///
/// Cheap to clone; every field is reference-counted. A `None` subsystem
/// answers its chat routes with 503 while everything else keeps serving.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Option<SessionLedger>,
    pub engine: Option<Arc<RagEngine>>,
    pub contact: Arc<ContactInfo>,
    pub profile: Arc<ProfileConfig>,
}

/// `{"detail": ...}` error body with the given status.
pub(crate) fn json_error(status: StatusCode, detail: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "detail": detail.to_string() }))).into_response()
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let router = Router::new()
        .route("/", get(rag::root))
        .route("/health", get(rag::health))
        .route("/chat", post(rag::chat))
        .route("/info", get(rag::info))
        .route("/conversation/suggest", get(rag::suggest))
        .route("/debug/graph-status", get(rag::graph_status))
        .route("/api/", get(canned::banner));
    let router = canned_routes(router, "");
    let router = canned_routes(router, "/api");
    router.layer(cors_layer(cors_origins)).with_state(state)
}

fn canned_routes(router: Router<AppState>, prefix: &str) -> Router<AppState> {
    router
        .route(&format!("{prefix}/chat/message"), post(canned::send_message))
        .route(&format!("{prefix}/chat/history/{{session_id}}"), get(canned::history))
        .route(&format!("{prefix}/chat/new-session"), post(canned::new_session))
        .route(&format!("{prefix}/chat/sessions"), get(canned::sessions))
        .route(&format!("{prefix}/contact"), get(canned::contact))
}

/// CORS for the configured origins. An empty list or `"*"` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o.trim()) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        if parsed.is_empty() {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(parsed)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Bind `bind_addr` and serve until `shutdown` is cancelled.
pub async fn serve(
    bind_addr: &str,
    router: Router,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("bind failed on {bind_addr}: {e}")))?;

    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| bind_addr.to_string());
    info!(bind_addr = %local, "http listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("server error: {e}")))?;

    info!("http shut down");
    Ok(())
}
