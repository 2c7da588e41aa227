//! Deterministic ZIP artifact.
//!
//! Entries are stored uncompressed with a fixed timestamp, so the same
//! approved set always yields the same bytes.

use std::io::{Cursor, Write};

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{ArtifactBuilder, ExportCard};
use crate::domain::{AspectRatio, GenerationRequest, RequestId, Resolution};
use crate::error::SpawnerError;

const MANIFEST: &str = "manifest.json";

#[derive(Serialize)]
struct Manifest<'a> {
    request_id: RequestId,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    cards: Vec<ManifestCard<'a>>,
}

#[derive(Serialize)]
struct ManifestCard<'a> {
    index: u32,
    version: u32,
    file: String,
    asset: &'a str,
    prompt: &'a str,
}

/// Packs approved images as `sheet-NN.<ext>` plus a `manifest.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArtifactBuilder;

impl ZipArtifactBuilder {
    fn entry_name(position: usize, card: &ExportCard) -> String {
        let extension = card.asset.extension().unwrap_or("bin");
        format!("sheet-{:02}.{extension}", position.saturating_add(1))
    }
}

fn zip_error(err: impl std::fmt::Display) -> SpawnerError {
    SpawnerError::Internal(format!("zip: {err}"))
}

impl ArtifactBuilder for ZipArtifactBuilder {
    fn extension(&self) -> &'static str {
        "zip"
    }

    fn content_type(&self) -> &'static str {
        "application/zip"
    }

    fn build(&self, request: &GenerationRequest, cards: &[ExportCard]) -> Result<Vec<u8>, SpawnerError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        let mut manifest_cards = Vec::with_capacity(cards.len());
        for (position, card) in cards.iter().enumerate() {
            let name = Self::entry_name(position, card);
            writer.start_file(name.as_str(), options).map_err(zip_error)?;
            writer.write_all(&card.bytes).map_err(zip_error)?;
            manifest_cards.push(ManifestCard {
                index: card.index,
                version: card.version,
                file: name,
                asset: card.asset.as_str(),
                prompt: &card.prompt,
            });
        }

        let manifest = Manifest {
            request_id: request.id,
            aspect_ratio: request.aspect_ratio,
            resolution: request.resolution,
            cards: manifest_cards,
        };
        let manifest = serde_json::to_vec_pretty(&manifest).map_err(zip_error)?;
        writer.start_file(MANIFEST, options).map_err(zip_error)?;
        writer.write_all(&manifest).map_err(zip_error)?;

        Ok(writer.finish().map_err(zip_error)?.into_inner())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::AssetRef;
    use crate::domain::record::tests::make_request;

    fn export_card(request_id: RequestId, index: u32, bytes: &[u8]) -> ExportCard {
        ExportCard {
            index,
            version: 1,
            prompt: format!("prompt {index}"),
            asset: AssetRef::for_card(request_id, index, 1, "png"),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn same_input_same_bytes() {
        let request = make_request(&["a", "b", "c"]);
        let cards = vec![
            export_card(request.id, 0, b"zero"),
            export_card(request.id, 2, b"two"),
        ];
        let builder = ZipArtifactBuilder;
        let Ok(first) = builder.build(&request, &cards) else {
            panic!("build failed");
        };
        let Ok(second) = builder.build(&request, &cards) else {
            panic!("build failed");
        };
        assert_eq!(first, second);
    }

    #[test]
    fn entries_follow_card_order() {
        let request = make_request(&["a", "b", "c"]);
        let cards = vec![
            export_card(request.id, 0, b"zero"),
            export_card(request.id, 2, b"two"),
        ];
        let Ok(bytes) = ZipArtifactBuilder.build(&request, &cards) else {
            panic!("build failed");
        };
        let Ok(archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
            panic!("not a zip");
        };
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names, vec!["sheet-01.png", "sheet-02.png", MANIFEST]);
    }

    #[test]
    fn manifest_lists_indices_and_versions() {
        let request = make_request(&["a", "b"]);
        let cards = vec![export_card(request.id, 1, b"one")];
        let Ok(bytes) = ZipArtifactBuilder.build(&request, &cards) else {
            panic!("build failed");
        };
        let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
            panic!("not a zip");
        };
        let Ok(mut file) = archive.by_name(MANIFEST) else {
            panic!("manifest missing");
        };
        let mut raw = String::new();
        assert!(std::io::Read::read_to_string(&mut file, &mut raw).is_ok());
        let Ok(json) = serde_json::from_str::<serde_json::Value>(&raw) else {
            panic!("manifest is not json");
        };
        assert_eq!(json["cards"][0]["index"], 1);
        assert_eq!(json["cards"][0]["file"], "sheet-01.png");
        assert_eq!(json["aspect_ratio"], "1:1");
    }
}
