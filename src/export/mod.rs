//! Export assembler: approved cards in, one artifact out.
//!
//! Selection and ordering live here; the artifact's layout belongs to an
//! [`ArtifactBuilder`].

pub mod zip_builder;

use std::fmt;

use crate::domain::{AssetRef, Card, GenerationRecord, GenerationRequest, RequestId};
use crate::error::SpawnerError;

pub use zip_builder::ZipArtifactBuilder;

/// One approved card with its loaded image.
#[derive(Clone, PartialEq, Eq)]
pub struct ExportCard {
    /// Card index.
    pub index: u32,
    /// Approved version.
    pub version: u32,
    /// Prompt of that version.
    pub prompt: String,
    /// Store address of the image.
    pub asset: AssetRef,
    /// Image bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ExportCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportCard")
            .field("index", &self.index)
            .field("version", &self.version)
            .field("asset", &self.asset)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Assembled export.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Exported generation.
    pub request_id: RequestId,
    /// File name under the exports directory.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub content_type: &'static str,
    /// Indices included, ascending.
    pub card_indices: Vec<u32>,
    /// Store address the artifact was written to.
    pub asset: AssetRef,
    /// Artifact bytes.
    pub bytes: Vec<u8>,
}

/// Turns an ordered sequence of approved cards into one artifact.
pub trait ArtifactBuilder: fmt::Debug + Send + Sync {
    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &'static str;

    /// MIME type of the produced artifact.
    fn content_type(&self) -> &'static str;

    /// Builds the artifact. Must be deterministic in its inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Internal`] if the artifact cannot be encoded.
    fn build(&self, request: &GenerationRequest, cards: &[ExportCard]) -> Result<Vec<u8>, SpawnerError>;
}

/// Approved cards of `record`, ordered by index.
///
/// # Errors
///
/// Returns [`SpawnerError::Precondition`] if no card is approved, and
/// [`SpawnerError::Internal`] if an approved card has no asset.
pub fn select_approved(record: &GenerationRecord) -> Result<Vec<(&Card, &AssetRef)>, SpawnerError> {
    let approved = record.approved_cards();
    if approved.is_empty() {
        return Err(SpawnerError::Precondition(format!(
            "generation {} has no approved cards",
            record.id()
        )));
    }
    approved
        .into_iter()
        .map(|card| {
            card.asset().map(|asset| (card, asset)).ok_or_else(|| {
                SpawnerError::Internal(format!("approved card {} has no asset", card.index()))
            })
        })
        .collect()
}
