//! Content-addressed references to stored card images.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::RequestId;
use crate::error::SpawnerError;

/// Relative, `/`-separated path of an asset under the record store root.
///
/// Card assets are addressed by `(request id, card index, version)` so two
/// versions of the same card never share a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    /// Builds the content address of one card version.
    #[must_use]
    pub fn for_card(request_id: RequestId, index: u32, version: u32, extension: &str) -> Self {
        Self(format!(
            "generations/{request_id}/cards/card-{index:03}-v{version}.{extension}"
        ))
    }

    /// Builds the address of a stored reference image.
    #[must_use]
    pub fn for_reference(name: &str) -> Self {
        Self(format!("references/{name}"))
    }

    /// Parses a client-supplied relative path.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] if the path is empty, absolute,
    /// or contains anything other than plain components.
    pub fn parse(raw: &str) -> Result<Self, SpawnerError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(SpawnerError::Validation("empty asset path".to_string()));
        }
        let plain = Path::new(trimmed)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !plain || trimmed.contains('\\') {
            return Err(SpawnerError::Validation(format!("invalid asset path: {raw}")));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the relative path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the reference against a store root.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
    }

    /// Returns the file extension, if any.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.0
            .rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps an image MIME type to the file extension used in the store.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// Maps a stored file extension back to its MIME type.
#[must_use]
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn versions_of_one_card_have_distinct_addresses() {
        let id = RequestId::new();
        let v1 = AssetRef::for_card(id, 2, 1, "png");
        let v2 = AssetRef::for_card(id, 2, 2, "png");
        assert_ne!(v1, v2);
        assert!(v1.as_str().ends_with("cards/card-002-v1.png"));
        assert_eq!(v2.extension(), Some("png"));
    }

    #[test]
    fn parse_rejects_traversal() {
        assert!(AssetRef::parse("../secrets.json").is_err());
        assert!(AssetRef::parse("generations/../../etc/passwd").is_err());
        assert!(AssetRef::parse("generations\\x").is_err());
        assert!(AssetRef::parse("").is_err());
    }

    #[test]
    fn parse_accepts_store_paths() {
        let Ok(asset) = AssetRef::parse("/references/abc.png") else {
            panic!("expected valid path");
        };
        assert_eq!(asset.as_str(), "references/abc.png");
        let root = Path::new("/data");
        assert_eq!(asset.resolve(root), Path::new("/data/references/abc.png"));
    }

    #[test]
    fn mime_mapping_is_symmetric_for_images() {
        for mime in ["image/png", "image/jpeg", "image/webp"] {
            assert_eq!(mime_for_extension(extension_for_mime(mime)), mime);
        }
        assert_eq!(extension_for_mime("text/plain"), "bin");
    }
}
