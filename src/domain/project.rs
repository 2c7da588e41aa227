//! Projects: the owners of a current generation and its archive stack.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::record::GenerationRecord;
use super::{ProjectId, RequestId};
use crate::error::SpawnerError;

/// Immutable snapshot of a superseded generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    archived_at: DateTime<Utc>,
    record: GenerationRecord,
}

impl ArchiveEntry {
    /// Captures a deep copy of `record`.
    #[must_use]
    pub fn capture(record: &GenerationRecord) -> Self {
        Self {
            archived_at: Utc::now(),
            record: record.clone(),
        }
    }

    /// When the generation was superseded.
    #[must_use]
    pub const fn archived_at(&self) -> DateTime<Utc> {
        self.archived_at
    }

    /// The record as it was before the sheet regeneration.
    #[must_use]
    pub const fn record(&self) -> &GenerationRecord {
        &self.record
    }
}

/// Last export of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExportMarker {
    /// Exported generation.
    pub request_id: RequestId,
    /// Card indices included, ascending.
    pub card_indices: Vec<u32>,
    /// Artifact file name under the exports directory.
    pub file_name: String,
    /// Export timestamp.
    pub exported_at: DateTime<Utc>,
}

/// Project aggregate persisted as `projects/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectData {
    /// Project identifier.
    pub project_id: ProjectId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Generation currently shown for the project.
    #[serde(default)]
    pub current: Option<RequestId>,
    #[serde(default)]
    archive: Vec<ArchiveEntry>,
    /// Last export, if any.
    #[serde(default)]
    pub export: Option<ExportMarker>,
}

impl ProjectData {
    /// Creates an empty project.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] for a blank name.
    pub fn new(name: &str) -> Result<Self, SpawnerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SpawnerError::Validation(
                "project name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            project_id: ProjectId::new(),
            name: name.to_string(),
            created_at: Utc::now(),
            current: None,
            archive: Vec::new(),
            export: None,
        })
    }

    /// Archive stack, newest first.
    #[must_use]
    pub fn archive(&self) -> &[ArchiveEntry] {
        &self.archive
    }

    /// Pushes a snapshot to the front of the archive stack.
    pub fn push_archive(&mut self, entry: ArchiveEntry) {
        self.archive.insert(0, entry);
    }

    /// Returns the archive entry at `position` (0 = newest).
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::ArchiveEntryNotFound`] past the end of the
    /// stack.
    pub fn archive_entry(&self, position: usize) -> Result<&ArchiveEntry, SpawnerError> {
        self.archive
            .get(position)
            .ok_or(SpawnerError::ArchiveEntryNotFound {
                project_id: self.project_id,
                position,
            })
    }
}

/// Concurrent project storage, one lock per project.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: RwLock<HashMap<ProjectId, Arc<RwLock<ProjectData>>>>,
}

impl ProjectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a project, replacing any entry with the same id.
    pub async fn insert(&self, project: ProjectData) -> ProjectId {
        let project_id = project.project_id;
        self.projects
            .write()
            .await
            .insert(project_id, Arc::new(RwLock::new(project)));
        project_id
    }

    /// Returns the project behind its lock.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::ProjectNotFound`] for an unknown id.
    pub async fn get(
        &self,
        project_id: ProjectId,
    ) -> Result<Arc<RwLock<ProjectData>>, SpawnerError> {
        self.projects
            .read()
            .await
            .get(&project_id)
            .cloned()
            .ok_or(SpawnerError::ProjectNotFound(project_id))
    }

    /// Number of projects.
    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    /// Returns `true` if there are no projects.
    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }
}
