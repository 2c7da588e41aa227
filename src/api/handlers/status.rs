//! Status polling handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::StatusResponse;
use crate::app_state::AppState;

/// `GET /status` — Progress of every generation.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Status",
    summary = "Poll status",
    description = "Returns a consistent snapshot of every generation: overall card counts plus per-card state, version and approval.",
    responses(
        (status = 200, description = "Status snapshot", body = StatusResponse),
    )
)]
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.generation_service.status().await;
    Json(StatusResponse::from(report))
}

/// Status routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
