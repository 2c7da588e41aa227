//! Generation handlers: submit, inspect, regenerate, approve, export.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::assets::binary_response;
use crate::api::dto::{
    CardDto, GenerationDto, RegenerateRequest, SubmitGenerationRequest, SubmitResponse,
};
use crate::app_state::AppState;
use crate::domain::RequestId;
use crate::error::{ErrorResponse, SpawnerError};
use crate::provider::ProviderCredential;
use crate::service::GenerationSummary;

/// Response header listing the card indices packed into an export.
pub const EXPORTED_CARDS_HEADER: &str = "x-exported-cards";

/// `POST /generations` — Submit a sheet for generation.
///
/// # Errors
///
/// Returns [`SpawnerError`] on invalid intake or storage failure.
#[utoipa::path(
    post,
    path = "/api/v1/generations",
    tag = "Generations",
    summary = "Submit a generation",
    description = "Validates the prompt blocks, creates one card per block and dispatches the provider calls in the background. Poll the returned id for progress.",
    request_body = SubmitGenerationRequest,
    responses(
        (status = 202, description = "Generation accepted", body = SubmitResponse),
        (status = 400, description = "Invalid intake", body = ErrorResponse),
        (status = 404, description = "Unknown project", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(req): Json<SubmitGenerationRequest>,
) -> Result<impl IntoResponse, SpawnerError> {
    let (intake, credential) = req.into_intake()?;
    let submission = state.generation_service.submit(intake, credential).await?;

    let response = SubmitResponse {
        request_id: submission.request_id,
        cards: submission.cards.iter().map(CardDto::from).collect(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// `GET /generations/{id}` — Get one generation.
///
/// # Errors
///
/// Returns [`SpawnerError::RequestNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/generations/{id}",
    tag = "Generations",
    summary = "Get generation",
    description = "Returns the request settings, aggregate status and every card.",
    params(("id" = RequestId, Path, description = "Request UUID")),
    responses(
        (status = 200, description = "Generation detail", body = GenerationDto),
        (status = 404, description = "Generation not found", body = ErrorResponse),
    )
)]
pub async fn get_generation(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
) -> Result<impl IntoResponse, SpawnerError> {
    let record = state.generation_service.get_record(id).await?;
    Ok(Json(GenerationDto::from(GenerationSummary::from(&record))))
}

/// `POST /generations/{id}/cards/{index}/regenerate` — Regenerate one card.
///
/// # Errors
///
/// Returns [`SpawnerError::InvalidState`] unless the card is `ready` or
/// `error`.
#[utoipa::path(
    post,
    path = "/api/v1/generations/{id}/cards/{index}/regenerate",
    tag = "Generations",
    summary = "Regenerate a card",
    description = "Clears the card's approval, optionally replaces its prompt and queues a new provider call. Sibling cards are untouched.",
    params(
        ("id" = RequestId, Path, description = "Request UUID"),
        ("index" = u32, Path, description = "Card index"),
    ),
    request_body(content = RegenerateRequest, description = "Optional prompt override and credential"),
    responses(
        (status = 202, description = "Regeneration queued", body = CardDto),
        (status = 400, description = "Blank replacement prompt", body = ErrorResponse),
        (status = 404, description = "Generation or card not found", body = ErrorResponse),
        (status = 409, description = "Card is not settled", body = ErrorResponse),
    )
)]
pub async fn regenerate_card(
    State(state): State<AppState>,
    Path((id, index)): Path<(RequestId, u32)>,
    body: Option<Json<RegenerateRequest>>,
) -> Result<impl IntoResponse, SpawnerError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let credential = ProviderCredential::from_optional(req.api_key);
    let (card, _batch) = state
        .generation_service
        .regenerate_card(id, index, req.prompt, credential)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(CardDto::from(&card))))
}

/// `POST /generations/{id}/cards/{index}/approve` — Approve one card.
///
/// # Errors
///
/// Returns [`SpawnerError::InvalidState`] unless the card is `ready`.
#[utoipa::path(
    post,
    path = "/api/v1/generations/{id}/cards/{index}/approve",
    tag = "Generations",
    summary = "Approve a card",
    description = "Marks the card's current version for export. Approving an approved card is a no-op.",
    params(
        ("id" = RequestId, Path, description = "Request UUID"),
        ("index" = u32, Path, description = "Card index"),
    ),
    responses(
        (status = 200, description = "Card approved", body = CardDto),
        (status = 404, description = "Generation or card not found", body = ErrorResponse),
        (status = 409, description = "Card is not ready", body = ErrorResponse),
    )
)]
pub async fn approve_card(
    State(state): State<AppState>,
    Path((id, index)): Path<(RequestId, u32)>,
) -> Result<impl IntoResponse, SpawnerError> {
    let card = state.generation_service.approve(id, index).await?;
    Ok(Json(CardDto::from(&card)))
}

/// `GET /generations/{id}/cards/{index}/image` — Current card image.
///
/// # Errors
///
/// Returns [`SpawnerError::AssetNotFound`] if the card has no image.
#[utoipa::path(
    get,
    path = "/api/v1/generations/{id}/cards/{index}/image",
    tag = "Generations",
    summary = "Get card image",
    description = "Streams the image of the card's current version.",
    params(
        ("id" = RequestId, Path, description = "Request UUID"),
        ("index" = u32, Path, description = "Card index"),
    ),
    responses(
        (status = 200, description = "Image bytes", content_type = "image/png", body = Vec<u8>),
        (status = 404, description = "No image for this card", body = ErrorResponse),
    )
)]
pub async fn card_image(
    State(state): State<AppState>,
    Path((id, index)): Path<(RequestId, u32)>,
) -> Result<impl IntoResponse, SpawnerError> {
    let (bytes, mime) = state.generation_service.card_image(id, index).await?;
    Ok(binary_response(bytes, mime))
}

/// `POST /generations/{id}/export` — Package approved cards.
///
/// # Errors
///
/// Returns [`SpawnerError::Precondition`] if no card is approved.
#[utoipa::path(
    post,
    path = "/api/v1/generations/{id}/export",
    tag = "Generations",
    summary = "Export approved cards",
    description = "Packs the approved cards' current images, in index order, into a ZIP archive with a JSON manifest. The archive is also kept in the store.",
    params(("id" = RequestId, Path, description = "Request UUID")),
    responses(
        (status = 200, description = "ZIP archive", content_type = "application/zip", body = Vec<u8>),
        (status = 404, description = "Generation not found", body = ErrorResponse),
        (status = 412, description = "No approved cards", body = ErrorResponse),
    )
)]
pub async fn export_generation(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
) -> Result<impl IntoResponse, SpawnerError> {
    let artifact = state.generation_service.export(id).await?;
    let indices = artifact
        .card_indices
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
            (header::HeaderName::from_static(EXPORTED_CARDS_HEADER), indices),
        ],
        artifact.bytes,
    ))
}

/// Generation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generations", post(submit_generation))
        .route("/generations/{id}", get(get_generation))
        .route(
            "/generations/{id}/cards/{index}/regenerate",
            post(regenerate_card),
        )
        .route("/generations/{id}/cards/{index}/approve", post(approve_card))
        .route("/generations/{id}/cards/{index}/image", get(card_image))
        .route("/generations/{id}/export", post(export_generation))
}
