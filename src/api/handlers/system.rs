//! System endpoints: health check and generation options.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::BlockKindInfo;
use crate::app_state::AppState;
use crate::domain::{AspectRatio, BlockKind, Resolution};

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Settings a submission may use.
#[derive(Debug, Serialize, ToSchema)]
pub struct OptionsResponse {
    aspect_ratios: Vec<AspectRatio>,
    resolutions: Vec<Resolution>,
    block_kinds: Vec<BlockKindInfo>,
}

/// `GET /config/options` — List supported generation settings.
#[utoipa::path(
    get,
    path = "/config/options",
    tag = "System",
    summary = "List generation options",
    description = "Returns the aspect ratios and resolutions the provider accepts, and every prompt block kind with its capabilities.",
    responses(
        (status = 200, description = "Option catalog", body = OptionsResponse),
    )
)]
pub async fn options_handler() -> impl IntoResponse {
    let options = OptionsResponse {
        aspect_ratios: AspectRatio::ALL.to_vec(),
        resolutions: Resolution::ALL.to_vec(),
        block_kinds: BlockKind::ALL
            .into_iter()
            .map(|kind| BlockKindInfo {
                kind,
                capabilities: kind.capabilities(),
            })
            .collect(),
    };
    (StatusCode::OK, Json(options))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/options", get(options_handler))
}
