//! Generation DTOs: submit, card regeneration and record views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::asset_url;
use crate::domain::{
    AspectRatio, AssetRef, BlockKind, Card, CardCounts, CardState, GenerationIntake, ProjectId,
    PromptBlock, RequestId, RequestStatus, Resolution,
};
use crate::error::SpawnerError;
use crate::provider::ProviderCredential;
use crate::service::GenerationSummary;

/// A prompt block as accepted on the wire: a bare string is a text block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PromptBlockInput {
    /// Plain prompt text.
    Text(String),
    /// Fully specified block.
    Block(PromptBlock),
}

impl From<PromptBlockInput> for PromptBlock {
    fn from(input: PromptBlockInput) -> Self {
        match input {
            PromptBlockInput::Text(text) => Self::text(text),
            PromptBlockInput::Block(block) => block,
        }
    }
}

/// Request body for `POST /generations`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitGenerationRequest {
    /// Aspect ratio shared by every card. Defaults to `"1:1"`.
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    /// Resolution shared by every card. Defaults to `"1K"`.
    #[serde(default = "default_resolution")]
    pub resolution: String,
    /// Ordered prompt blocks; each becomes one card.
    #[serde(default)]
    pub prompts: Vec<PromptBlockInput>,
    /// YAML prompt file whose prompts follow `prompts`.
    #[serde(default)]
    pub prompt_yaml: Option<String>,
    /// Project the generation becomes current for.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// Stored reference images sent with every card.
    #[serde(default)]
    pub references: Vec<String>,
    /// Provider API key for this request. Never persisted.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_aspect_ratio() -> String {
    AspectRatio::Square.as_str().to_string()
}

fn default_resolution() -> String {
    Resolution::OneK.as_str().to_string()
}

impl SubmitGenerationRequest {
    /// Splits the body into the engine intake and the optional credential.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::Validation`] if `prompt_yaml` is present but
    /// empty, malformed or without prompts.
    pub fn into_intake(self) -> Result<(GenerationIntake, Option<ProviderCredential>), SpawnerError> {
        let mut intake = GenerationIntake {
            aspect_ratio: self.aspect_ratio,
            resolution: self.resolution,
            blocks: self.prompts.into_iter().map(PromptBlock::from).collect(),
            project_id: self.project_id,
            references: self.references,
        };
        if let Some(raw) = self.prompt_yaml.as_deref() {
            intake.append_prompt_file(raw)?;
        }
        Ok((intake, ProviderCredential::from_optional(self.api_key)))
    }
}

/// Optional body for card and sheet regeneration.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegenerateRequest {
    /// Replacement prompt text for the card. Ignored for whole sheets.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Provider API key for this regeneration.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// One card as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CardDto {
    /// Position within the request.
    pub index: u32,
    /// Block kind the card came from.
    pub kind: BlockKind,
    /// Prompt text of the current version.
    pub prompt: String,
    /// Block reference image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Lifecycle state.
    pub state: CardState,
    /// Version of the current image, starting at 1.
    pub version: u32,
    /// Approval flag for the current version.
    pub approved: bool,
    /// Store path of the current image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetRef>,
    /// URL serving the current image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Failure detail of the last attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Text returned by the model alongside the image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_text: Vec<String>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

impl From<&Card> for CardDto {
    fn from(card: &Card) -> Self {
        Self {
            index: card.index(),
            kind: card.kind(),
            prompt: card.prompt().to_string(),
            reference: card.reference().map(str::to_string),
            state: card.state(),
            version: card.version(),
            approved: card.is_approved(),
            asset: card.asset().cloned(),
            image_url: card.asset().map(asset_url),
            error: card.error().map(str::to_string),
            model_text: card.model_text().to_vec(),
            updated_at: card.updated_at(),
        }
    }
}

/// Full view of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GenerationDto {
    /// Request identifier.
    pub request_id: RequestId,
    /// Owning project, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    /// First line of the first prompt.
    pub title: String,
    /// Aggregate status derived from the cards.
    pub status: RequestStatus,
    /// Shared aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Shared resolution.
    pub resolution: Resolution,
    /// Intake timestamp.
    pub created_at: DateTime<Utc>,
    /// Last persisted change.
    pub updated_at: DateTime<Utc>,
    /// Record revision, bumped on every persisted change.
    pub revision: u64,
    /// Per-state card counts.
    pub counts: CardCounts,
    /// Every card, by index.
    pub cards: Vec<CardDto>,
}

impl From<GenerationSummary> for GenerationDto {
    fn from(summary: GenerationSummary) -> Self {
        Self {
            request_id: summary.request_id,
            project_id: summary.project_id,
            title: summary.title,
            status: summary.status,
            aspect_ratio: summary.aspect_ratio,
            resolution: summary.resolution,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            revision: summary.revision,
            counts: summary.counts,
            cards: summary.cards.iter().map(CardDto::from).collect(),
        }
    }
}

/// Response body for `POST /generations` (202 Accepted).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// Identifier to poll.
    pub request_id: RequestId,
    /// Cards as created.
    pub cards: Vec<CardDto>,
}
