//! Reference image upload.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::dto::asset_url;
use crate::app_state::AppState;
use crate::domain::AssetRef;
use crate::error::{ErrorResponse, SpawnerError};

/// Stored reference image.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReferenceUploadResponse {
    /// Name to list in a submission's `references` or a block's `reference`.
    pub name: String,
    /// URL serving the stored image.
    pub url: String,
}

/// `POST /references` — Upload a reference image.
///
/// # Errors
///
/// Returns [`SpawnerError::Validation`] for an empty body or a
/// `Content-Type` that is not an image.
#[utoipa::path(
    post,
    path = "/api/v1/references",
    tag = "References",
    summary = "Upload reference image",
    description = "Stores the raw request body under its SHA-256 digest. Uploading the same image twice yields the same name.",
    request_body(content = Vec<u8>, content_type = "image/png", description = "Raw image bytes"),
    responses(
        (status = 201, description = "Reference stored", body = ReferenceUploadResponse),
        (status = 400, description = "Empty or non-image upload", body = ErrorResponse),
    )
)]
pub async fn upload_reference(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, SpawnerError> {
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or_default();

    let name = state.generation_service.store_reference(&body, mime).await?;
    let url = asset_url(&AssetRef::for_reference(&name));
    Ok((StatusCode::CREATED, Json(ReferenceUploadResponse { name, url })))
}

/// Reference routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/references", post(upload_reference))
}
