//! Project handlers: create, get, regenerate sheet, archive inspection.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ArchiveEntryDto, ArchiveListResponse, CardDto, CreateProjectRequest, PaginationParams,
    ProjectDto, RegenerateRequest, SheetRegenerationResponse,
};
use crate::app_state::AppState;
use crate::domain::ProjectId;
use crate::error::{ErrorResponse, SpawnerError};
use crate::provider::ProviderCredential;

/// `POST /projects` — Create a project.
///
/// # Errors
///
/// Returns [`SpawnerError::Validation`] for a blank name.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    summary = "Create a project",
    description = "Creates an empty project. Submitting a generation with its id makes that generation the project's current sheet.",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectDto),
        (status = 400, description = "Blank name", body = ErrorResponse),
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, SpawnerError> {
    let project = state.generation_service.create_project(&req.name).await?;
    Ok((StatusCode::CREATED, Json(ProjectDto::from(&project))))
}

/// `GET /projects/{id}` — Get project details.
///
/// # Errors
///
/// Returns [`SpawnerError::ProjectNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    summary = "Get project",
    description = "Returns the current generation id, archive depth and last export.",
    params(("id" = ProjectId, Path, description = "Project UUID")),
    responses(
        (status = 200, description = "Project detail", body = ProjectDto),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
) -> Result<impl IntoResponse, SpawnerError> {
    let project = state.generation_service.get_project(id).await?;
    Ok(Json(ProjectDto::from(&project)))
}

/// `POST /projects/{id}/regenerate` — Regenerate the whole sheet.
///
/// # Errors
///
/// Returns [`SpawnerError::InvalidState`] while any card is in flight.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/regenerate",
    tag = "Projects",
    summary = "Regenerate the current sheet",
    description = "Archives a snapshot of the project's current generation, then regenerates every card with its own prompt.",
    params(("id" = ProjectId, Path, description = "Project UUID")),
    request_body(content = RegenerateRequest, description = "Optional credential"),
    responses(
        (status = 202, description = "Sheet regeneration queued", body = SheetRegenerationResponse),
        (status = 404, description = "Project or current generation not found", body = ErrorResponse),
        (status = 409, description = "A card is still in flight", body = ErrorResponse),
    )
)]
pub async fn regenerate_sheet(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
    body: Option<Json<RegenerateRequest>>,
) -> Result<impl IntoResponse, SpawnerError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let credential = ProviderCredential::from_optional(req.api_key);
    let regeneration = state
        .generation_service
        .regenerate_sheet(id, credential)
        .await?;

    let response = SheetRegenerationResponse {
        project_id: id,
        request_id: regeneration.request_id,
        archive_len: regeneration.archive_len,
        cards: regeneration.cards.iter().map(CardDto::from).collect(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// `GET /projects/{id}/archive` — List archived generations.
///
/// # Errors
///
/// Returns [`SpawnerError::ProjectNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/archive",
    tag = "Projects",
    summary = "List archive",
    description = "Returns archived generations newest first, paginated.",
    params(
        ("id" = ProjectId, Path, description = "Project UUID"),
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated archive", body = ArchiveListResponse),
        (status = 404, description = "Project not found", body = ErrorResponse),
    )
)]
pub async fn list_archive(
    State(state): State<AppState>,
    Path(id): Path<ProjectId>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, SpawnerError> {
    let params = params.clamped();
    let offset = params.offset();
    let (entries, total) = state
        .generation_service
        .archive(id, offset, params.per_page as usize)
        .await?;

    let data = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| ArchiveEntryDto::new(offset + i, entry))
        .collect();

    Ok(Json(ArchiveListResponse {
        data,
        pagination: params.meta(total),
    }))
}

/// `GET /projects/{id}/archive/{position}` — One archived generation.
///
/// # Errors
///
/// Returns [`SpawnerError::ArchiveEntryNotFound`] past the archive depth.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/archive/{position}",
    tag = "Projects",
    summary = "Get archive entry",
    description = "Returns the archived generation at `position` (0 = newest). Its image URLs stay valid.",
    params(
        ("id" = ProjectId, Path, description = "Project UUID"),
        ("position" = usize, Path, description = "Archive position, 0 = newest"),
    ),
    responses(
        (status = 200, description = "Archive entry", body = ArchiveEntryDto),
        (status = 404, description = "Project or entry not found", body = ErrorResponse),
    )
)]
pub async fn get_archive_entry(
    State(state): State<AppState>,
    Path((id, position)): Path<(ProjectId, usize)>,
) -> Result<impl IntoResponse, SpawnerError> {
    let entry = state.generation_service.archive_entry(id, position).await?;
    Ok(Json(ArchiveEntryDto::new(position, &entry)))
}

/// Project routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project))
        .route("/projects/{id}", get(get_project))
        .route("/projects/{id}/regenerate", post(regenerate_sheet))
        .route("/projects/{id}/archive", get(list_archive))
        .route("/projects/{id}/archive/{position}", get(get_archive_entry))
}
