//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use super::dto::{
    ArchiveEntryDto, ArchiveListResponse, BlockKindInfo, CardDto, CreateProjectRequest,
    GenerationDto, PaginationMeta, ProjectDto, PromptBlockInput, RegenerateRequest,
    SheetRegenerationResponse, StatusResponse, SubmitGenerationRequest, SubmitResponse,
};
use super::handlers::{assets, generation, project, references, status, system};
use crate::domain::{
    AspectRatio, AssetRef, BlockKind, Capabilities, CardCounts, CardState, ExportMarker,
    PromptBlock, RequestStatus, Resolution,
};
use crate::error::{ErrorBody, ErrorKind, ErrorResponse};

/// OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "sheet-spawner",
        description = "Generation job and versioning engine for prompt-sheet image generation."
    ),
    paths(
        system::health_handler,
        system::options_handler,
        generation::submit_generation,
        generation::get_generation,
        generation::regenerate_card,
        generation::approve_card,
        generation::card_image,
        generation::export_generation,
        project::create_project,
        project::get_project,
        project::regenerate_sheet,
        project::list_archive,
        project::get_archive_entry,
        status::get_status,
        references::upload_reference,
        assets::get_asset,
    ),
    components(schemas(
        SubmitGenerationRequest,
        PromptBlockInput,
        PromptBlock,
        BlockKind,
        Capabilities,
        BlockKindInfo,
        AspectRatio,
        Resolution,
        RegenerateRequest,
        SubmitResponse,
        CardDto,
        CardState,
        AssetRef,
        GenerationDto,
        RequestStatus,
        CardCounts,
        StatusResponse,
        CreateProjectRequest,
        ProjectDto,
        ExportMarker,
        SheetRegenerationResponse,
        ArchiveEntryDto,
        ArchiveListResponse,
        PaginationMeta,
        references::ReferenceUploadResponse,
        system::HealthResponse,
        system::OptionsResponse,
        ErrorResponse,
        ErrorBody,
        ErrorKind,
    )),
    tags(
        (name = "Generations", description = "Submit, inspect, regenerate, approve and export"),
        (name = "Projects", description = "Projects, whole-sheet regeneration and archive"),
        (name = "Status", description = "Progress polling"),
        (name = "References", description = "Reference image uploads"),
        (name = "Assets", description = "Stored images and exports"),
        (name = "System", description = "Health and options"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/health",
            "/config/options",
            "/api/v1/generations",
            "/api/v1/generations/{id}",
            "/api/v1/generations/{id}/cards/{index}/regenerate",
            "/api/v1/generations/{id}/cards/{index}/approve",
            "/api/v1/generations/{id}/cards/{index}/image",
            "/api/v1/generations/{id}/export",
            "/api/v1/status",
            "/api/v1/projects",
            "/api/v1/projects/{id}",
            "/api/v1/projects/{id}/regenerate",
            "/api/v1/projects/{id}/archive",
            "/api/v1/projects/{id}/archive/{position}",
            "/api/v1/references",
            "/api/v1/assets/{path}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
