//! Handlers for the canned topic chat and its session ledger.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::{AppState, json_error};
use crate::ledger::SessionLedger;
use crate::ledger::store::format_ts;

const NOT_CONFIGURED: &str = "Chat store is not configured";
const INTERNAL: &str = "Internal server error";

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

fn ledger(state: &AppState) -> Result<&SessionLedger, Response> {
    state
        .ledger
        .as_ref()
        .ok_or_else(|| json_error(StatusCode::SERVICE_UNAVAILABLE, NOT_CONFIGURED))
}

/// GET /api/
pub(super) async fn banner(State(state): State<AppState>) -> Response {
    Json(json!({
        "message": format!("{} chat API", state.profile.name),
        "status": "running",
    }))
    .into_response()
}

/// POST /chat/message
pub(super) async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<MessageRequest>,
) -> Response {
    let ledger = match ledger(&state) {
        Ok(l) => l,
        Err(resp) => return resp,
    };
    match ledger.record_turn(req.session_id, req.message).await {
        Ok(turn) => Json(json!({
            "response": turn.response,
            "question_type": turn.topic.as_str(),
            "timestamp": format_ts(&turn.timestamp),
            "session_id": turn.session_id,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "chat message failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
        }
    }
}

/// GET /chat/history/{session_id}
pub(super) async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let ledger = match ledger(&state) {
        Ok(l) => l,
        Err(resp) => return resp,
    };
    match ledger.history(session_id.clone()).await {
        Ok(messages) => {
            let messages: Vec<_> = messages
                .iter()
                .map(|m| {
                    json!({
                        "id": m.id,
                        "type": m.role.as_str(),
                        "content": m.content,
                        "timestamp": format_ts(&m.timestamp),
                    })
                })
                .collect();
            Json(json!({ "messages": messages, "session_id": session_id })).into_response()
        }
        Err(e) => {
            error!(%session_id, error = %e, "history read failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
        }
    }
}

/// POST /chat/new-session
pub(super) async fn new_session(State(state): State<AppState>) -> Response {
    let ledger = match ledger(&state) {
        Ok(l) => l,
        Err(resp) => return resp,
    };
    let (session_id, created_at) = ledger.new_session();
    Json(json!({
        "session_id": session_id,
        "created_at": format_ts(&created_at),
    }))
    .into_response()
}

/// GET /chat/sessions
pub(super) async fn sessions(State(state): State<AppState>) -> Response {
    let ledger = match ledger(&state) {
        Ok(l) => l,
        Err(resp) => return resp,
    };
    match ledger.sessions().await {
        Ok(sessions) => {
            let sessions: Vec<_> = sessions
                .iter()
                .map(|s| {
                    json!({
                        "session_id": s.session_id,
                        "title": s.title,
                        "created_at": format_ts(&s.created_at),
                        "message_count": s.message_count,
                    })
                })
                .collect();
            Json(json!({ "sessions": sessions })).into_response()
        }
        Err(e) => {
            error!(error = %e, "session listing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
        }
    }
}

/// GET /contact
pub(super) async fn contact(State(state): State<AppState>) -> Response {
    Json(state.contact.as_ref().clone()).into_response()
}
