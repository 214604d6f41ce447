use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tracing::Instrument;

use crate::http::server::ServerState;

#[derive(Debug, Deserialize)]
pub struct ProcessMessageRequest {
    sender_id: Option<String>,
    #[serde(default)]
    message: String,
}

/// `POST /process_message` (§6, §4.8).
pub async fn handler(
    State(state): State<ServerState>,
    body: Option<Json<ProcessMessageRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "sender_id é obrigatório" })),
        );
    };
    let Some(sender_id) = request.sender_id.filter(|s| !s.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "sender_id é obrigatório" })),
        );
    };

    let span = tracing::info_span!("process_message", sender_id = %sender_id);
    let payload = state
        .engine
        .process_message(&sender_id, &request.message)
        .instrument(span)
        .await;
    match payload {
        Some(payload) => (StatusCode::OK, Json(json!({ "response_payload": payload }))),
        None => (StatusCode::OK, Json(json!({}))),
    }
}
