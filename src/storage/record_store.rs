//! Filesystem implementation of the record store.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::domain::asset::{extension_for_mime, mime_for_extension};
use crate::domain::{AssetRef, GenerationRecord, ProjectData, ProjectId, RequestId};
use crate::error::SpawnerError;

const GENERATIONS: &str = "generations";
const PROJECTS: &str = "projects";
const REFERENCES: &str = "references";
const EXPORTS: &str = "exports";
const RECORD_FILE: &str = "record.json";

/// Filesystem-backed record store rooted at one directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Opens (and creates, if needed) a store at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] if the directory tree cannot be
    /// created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, SpawnerError> {
        let root = root.into();
        for dir in [GENERATIONS, PROJECTS, REFERENCES, EXPORTS] {
            tokio::fs::create_dir_all(root.join(dir))
                .await
                .map_err(|e| storage_error("create", &root.join(dir), &e))?;
        }
        Ok(Self { root })
    }

    /// Data root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, request_id: RequestId) -> PathBuf {
        self.root.join(GENERATIONS).join(request_id.to_string())
    }

    fn project_path(&self, project_id: ProjectId) -> PathBuf {
        self.root.join(PROJECTS).join(format!("{project_id}.json"))
    }

    /// Stores the image of one card version and returns its address.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] on I/O failure.
    pub async fn put(
        &self,
        request_id: RequestId,
        index: u32,
        version: u32,
        bytes: &[u8],
        mime_type: &str,
    ) -> Result<AssetRef, SpawnerError> {
        let asset = AssetRef::for_card(request_id, index, version, extension_for_mime(mime_type));
        write_atomic(&asset.resolve(&self.root), bytes).await?;
        Ok(asset)
    }

    /// Reads a stored asset with its MIME type.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::AssetNotFound`] if nothing is stored there
    /// and [`SpawnerError::Storage`] on other I/O failures.
    pub async fn read_asset(&self, asset: &AssetRef) -> Result<(Vec<u8>, &'static str), SpawnerError> {
        let path = asset.resolve(&self.root);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SpawnerError::AssetNotFound(asset.to_string())
            } else {
                storage_error("read", &path, &e)
            }
        })?;
        Ok((bytes, mime_for_extension(asset.extension().unwrap_or_default())))
    }

    /// Replaces the sidecar of a request.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] on I/O or encoding failure.
    pub async fn write_record(&self, record: &GenerationRecord) -> Result<(), SpawnerError> {
        let path = self.generation_dir(record.id()).join(RECORD_FILE);
        write_json(&path, record).await
    }

    /// Deletes a request's directory. A missing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] on other I/O failures.
    pub async fn remove_record(&self, request_id: RequestId) -> Result<(), SpawnerError> {
        let dir = self.generation_dir(request_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &dir, &e)),
        }
    }

    /// Reads the sidecar of a request.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::RequestNotFound`] if there is no sidecar and
    /// [`SpawnerError::Storage`] if it cannot be read or decoded.
    pub async fn read_record(&self, request_id: RequestId) -> Result<GenerationRecord, SpawnerError> {
        let path = self.generation_dir(request_id).join(RECORD_FILE);
        read_json(&path)
            .await?
            .ok_or(SpawnerError::RequestNotFound(request_id))
    }

    /// Loads every readable sidecar. Corrupt ones are skipped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] if the generations directory
    /// cannot be listed.
    pub async fn load_records(&self) -> Result<Vec<GenerationRecord>, SpawnerError> {
        let dir = self.root.join(GENERATIONS);
        let mut records = Vec::new();
        for path in list_dir(&dir).await? {
            let sidecar = path.join(RECORD_FILE);
            match read_json::<GenerationRecord>(&sidecar).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %sidecar.display(), error = %e, "skipping unreadable sidecar"),
            }
        }
        records.sort_by_key(|r| r.request.created_at);
        Ok(records)
    }

    /// Replaces a project file.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] on I/O or encoding failure.
    pub async fn write_project(&self, project: &ProjectData) -> Result<(), SpawnerError> {
        write_json(&self.project_path(project.project_id), project).await
    }

    /// Loads every readable project file, skipping corrupt ones.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] if the projects directory cannot
    /// be listed.
    pub async fn load_projects(&self) -> Result<Vec<ProjectData>, SpawnerError> {
        let dir = self.root.join(PROJECTS);
        let mut projects = Vec::new();
        for path in list_dir(&dir).await? {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<ProjectData>(&path).await {
                Ok(Some(project)) => projects.push(project),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable project"),
            }
        }
        Ok(projects)
    }

    /// Stores an uploaded reference image under its SHA-256 digest and
    /// returns the reference name.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] for an empty body or a non-image
    /// MIME type, and [`SpawnerError::Storage`] on I/O failure.
    pub async fn put_reference(&self, bytes: &[u8], mime_type: &str) -> Result<String, SpawnerError> {
        if bytes.is_empty() {
            return Err(SpawnerError::Validation("reference image is empty".to_string()));
        }
        let extension = extension_for_mime(mime_type);
        if extension == "bin" {
            return Err(SpawnerError::Validation(format!(
                "unsupported reference type: {mime_type}"
            )));
        }
        let digest = Sha256::digest(bytes);
        let name = format!("{digest:x}.{extension}");
        let asset = AssetRef::for_reference(&name);
        write_atomic(&asset.resolve(&self.root), bytes).await?;
        Ok(name)
    }

    /// Returns `true` if a reference image with this name is stored.
    pub async fn has_reference(&self, name: &str) -> bool {
        if !is_plain_file_name(name) {
            return false;
        }
        tokio::fs::metadata(self.root.join(REFERENCES).join(name))
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    /// Reads a reference image with its MIME type.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::ReferenceNotFound`] for an unknown or
    /// malformed name.
    pub async fn read_reference(&self, name: &str) -> Result<(Vec<u8>, &'static str), SpawnerError> {
        if !is_plain_file_name(name) {
            return Err(SpawnerError::ReferenceNotFound(name.to_string()));
        }
        self.read_asset(&AssetRef::for_reference(name))
            .await
            .map_err(|e| match e {
                SpawnerError::AssetNotFound(_) => SpawnerError::ReferenceNotFound(name.to_string()),
                other => other,
            })
    }

    /// Writes an export artifact and returns its address.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Storage`] on I/O failure.
    pub async fn write_export(&self, file_name: &str, bytes: &[u8]) -> Result<AssetRef, SpawnerError> {
        if !is_plain_file_name(file_name) {
            return Err(SpawnerError::Internal(format!("bad export name {file_name}")));
        }
        let asset = AssetRef::parse(&format!("{EXPORTS}/{file_name}"))?;
        write_atomic(&asset.resolve(&self.root), bytes).await?;
        Ok(asset)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && name != ".."
}

fn storage_error(action: &str, path: &Path, err: &std::io::Error) -> SpawnerError {
    SpawnerError::Storage(format!("{action} {}: {err}", path.display()))
}

/// Writes to a sibling temp file, then renames over the target.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SpawnerError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| storage_error("create", parent, &e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| storage_error("write", &tmp, &e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| storage_error("rename", path, &e))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SpawnerError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes).await
}

/// `Ok(None)` when the file does not exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SpawnerError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(storage_error("read", path, &e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| SpawnerError::Storage(format!("decode {}: {e}", path.display())))
}

async fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, SpawnerError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| storage_error("list", dir, &e))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| storage_error("list", dir, &e))?
    {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}
