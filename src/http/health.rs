use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use parking_lot::Mutex;
use serde_json::json;

use crate::http::server::ServerState;

/// Startup/reload health bookkeeping, read by `GET /health` (§6).
///
/// Separate from `FlowRegistry`/`SessionStore` because it tracks the last
/// reload *attempt*, including failures the registry never sees (a failed
/// reload leaves the registry untouched, per §4.9).
#[derive(Default)]
pub struct HealthState {
    meta: Mutex<HealthMeta>,
}

#[derive(Default, Clone)]
struct HealthMeta {
    last_flow_error: Option<String>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reload_success(&self) {
        self.meta.lock().last_flow_error = None;
    }

    pub fn record_reload_error(&self, reason: &str) {
        self.meta.lock().last_flow_error = Some(reason.to_string());
    }

    fn last_flow_error(&self) -> Option<String> {
        self.meta.lock().last_flow_error.clone()
    }
}

pub async fn handler(State(state): State<ServerState>) -> impl IntoResponse {
    let flow_loaded = state.engine.flow_loaded();
    let db_connection = state.engine.db_connection_ok().await;

    if flow_loaded && db_connection {
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "details": {
                    "flow_loaded": true,
                    "db_connection": true,
                },
            })),
        );
    }

    let mut details = json!({
        "flow_loaded": flow_loaded,
        "db_connection": db_connection,
    });
    if !flow_loaded {
        if let Some(reason) = state.health.last_flow_error() {
            details["flow_error"] = json!(reason);
        }
    }
    if !db_connection {
        details["db_error"] = json!("unable to reach the flows database");
    }

    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "status": "degraded",
            "details": details,
        })),
    )
}
