//! Handlers for the retrieval-augmented chat and its diagnostics.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::AppState;
use crate::knowledge::KnowledgeError;
use crate::rag::HistoryEntry;
use crate::rag::prompt::{ErrorKind, error_response};

const NOT_INITIALIZED: &str = "Chatbot is not initialized. Please check your configuration.";
const NOT_READY: &str = "Chatbot is not ready. Please try again in a moment.";

/// Error body for `/chat`: the `detail` for API clients plus a `response`
/// the widget can show as the bot's reply.
fn chat_error(status: StatusCode, detail: impl std::fmt::Display, kind: ErrorKind) -> Response {
    let body = json!({
        "detail": detail.to_string(),
        "response": error_response(kind),
    });
    (status, Json(body)).into_response()
}

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    message: String,
    #[serde(default)]
    conversation_history: Vec<HistoryEntry>,
}

/// GET /
pub(super) async fn root(State(state): State<AppState>) -> Response {
    Json(json!({
        "status": "healthy",
        "message": format!("{} API is running!", state.profile.name),
    }))
    .into_response()
}

/// GET /health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let ready = match &state.engine {
        Some(engine) => engine.is_ready().await,
        None => false,
    };
    let body = if ready {
        json!({
            "status": "healthy",
            "message": format!("{} API and chatbot are ready!", state.profile.name),
        })
    } else {
        json!({
            "status": "degraded",
            "message": "API is running but chatbot is not initialized",
        })
    };
    Json(body).into_response()
}

/// POST /chat
pub(super) async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    let Some(engine) = &state.engine else {
        return chat_error(StatusCode::SERVICE_UNAVAILABLE, NOT_INITIALIZED, ErrorKind::General);
    };
    if !engine.is_ready().await {
        return chat_error(
            StatusCode::SERVICE_UNAVAILABLE,
            NOT_READY,
            ErrorKind::Initialization,
        );
    }
    match engine
        .process_message(&req.message, &req.conversation_history)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(KnowledgeError::NotReady) => {
            warn!("engine left ready state mid-request");
            chat_error(
                StatusCode::SERVICE_UNAVAILABLE,
                NOT_READY,
                ErrorKind::Initialization,
            )
        }
        Err(e) => {
            error!(error = %e, "chat request failed");
            chat_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing your message: {e}"),
                ErrorKind::General,
            )
        }
    }
}

/// GET /info
pub(super) async fn info(State(state): State<AppState>) -> Response {
    let p = &state.profile;
    Json(json!({
        "name": p.name,
        "description": p.description,
        "capabilities": p.capabilities,
        "example_questions": p.example_questions,
        "limitations": p.limitations,
    }))
    .into_response()
}

/// GET /conversation/suggest
pub(super) async fn suggest(State(state): State<AppState>) -> Response {
    Json(json!({ "starters": state.profile.starters })).into_response()
}

/// GET /debug/graph-status
pub(super) async fn graph_status(State(state): State<AppState>) -> Response {
    match &state.engine {
        Some(engine) => Json(engine.debug_info().await).into_response(),
        None => Json(json!({
            "status": "not_initialized",
            "error": "Chatbot runner not created",
        }))
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_chat_body_carries_general_apology() {
        let err = KnowledgeError::Index("disk gone".into());
        let resp = chat_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error processing your message: {err}"),
            ErrorKind::General,
        );
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(v["detail"].as_str().unwrap().starts_with("Error processing your message: "));
        assert_eq!(v["response"], error_response(ErrorKind::General));
    }
}
