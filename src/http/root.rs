use axum::response::IntoResponse;

/// `GET|POST /` liveness banner (§6). Deliberately not JSON: this endpoint
/// predates the rest of the contract and callers poll it with plain HTTP
/// checks, not clients expecting a typed body.
pub async fn handler() -> impl IntoResponse {
    "flow-runner-host is running"
}
