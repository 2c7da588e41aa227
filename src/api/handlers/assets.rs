//! Stored asset serving, including archived versions.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::app_state::AppState;
use crate::error::{ErrorResponse, SpawnerError};

/// Builds a binary response. Asset paths embed their version, so the
/// bytes behind a path never change.
pub(crate) fn binary_response(bytes: Vec<u8>, mime: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    )
        .into_response()
}

/// `GET /assets/{path}` — Any stored asset.
///
/// # Errors
///
/// Returns [`SpawnerError::Validation`] for a path escaping the store and
/// [`SpawnerError::AssetNotFound`] if nothing is stored there.
#[utoipa::path(
    get,
    path = "/api/v1/assets/{path}",
    tag = "Assets",
    summary = "Get stored asset",
    description = "Serves card images of any version, reference images and export archives by their store path.",
    params(("path" = String, Path, description = "Store-relative asset path")),
    responses(
        (status = 200, description = "Asset bytes", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 400, description = "Malformed path", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse),
    )
)]
pub async fn get_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, SpawnerError> {
    let (bytes, mime) = state.generation_service.read_asset(&path).await?;
    Ok(binary_response(bytes, mime))
}

/// Asset routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/assets/{*path}", get(get_asset))
}
