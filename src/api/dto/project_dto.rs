//! Project DTOs: create, detail, sheet regeneration and archive views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use super::generation_dto::{CardDto, GenerationDto};
use crate::domain::{ArchiveEntry, ExportMarker, ProjectData, ProjectId, RequestId};
use crate::service::GenerationSummary;

/// Request body for `POST /projects`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    /// Display name, must not be blank.
    pub name: String,
}

/// Project detail for `GET /projects/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectDto {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Current generation, if one was submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<RequestId>,
    /// Number of archived generations.
    pub archive_len: usize,
    /// Last export of the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportMarker>,
}

impl From<&ProjectData> for ProjectDto {
    fn from(project: &ProjectData) -> Self {
        Self {
            project_id: project.project_id,
            name: project.name.clone(),
            created_at: project.created_at,
            current: project.current,
            archive_len: project.archive().len(),
            export: project.export.clone(),
        }
    }
}

/// Response body for `POST /projects/{id}/regenerate` (202 Accepted).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SheetRegenerationResponse {
    /// Project whose sheet was regenerated.
    pub project_id: ProjectId,
    /// Generation being regenerated (unchanged id).
    pub request_id: RequestId,
    /// Archive depth after the push.
    pub archive_len: usize,
    /// Cards as queued.
    pub cards: Vec<CardDto>,
}

/// One archived generation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArchiveEntryDto {
    /// Position in the archive, 0 = newest.
    pub position: usize,
    /// When the entry was archived.
    pub archived_at: DateTime<Utc>,
    /// The generation as it was before regeneration.
    pub generation: GenerationDto,
}

impl ArchiveEntryDto {
    /// Builds the view of the entry at `position`.
    #[must_use]
    pub fn new(position: usize, entry: &ArchiveEntry) -> Self {
        Self {
            position,
            archived_at: entry.archived_at(),
            generation: GenerationDto::from(GenerationSummary::from(entry.record())),
        }
    }
}

/// Paginated list response for `GET /projects/{id}/archive`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArchiveListResponse {
    /// Entries of this page, newest first.
    pub data: Vec<ArchiveEntryDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
