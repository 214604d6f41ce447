use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crate::http::server::ServerState;

/// `POST /reload_flow` (§6, §4.9).
pub async fn handler(State(state): State<ServerState>) -> impl IntoResponse {
    match state.engine.reload().await {
        Ok(changed) => {
            state.health.record_reload_success();
            let message = if changed {
                "fluxo recarregado; sessões descartadas"
            } else {
                "fluxo recarregado; nenhuma mudança de id"
            };
            tracing::info!(changed, "flow reload succeeded");
            (
                StatusCode::OK,
                Json(json!({ "success": true, "message": message })),
            )
        }
        Err(err) => {
            state.health.record_reload_error(&err.to_string());
            tracing::error!(error = %err, "flow reload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": err.to_string() })),
            )
        }
    }
}
