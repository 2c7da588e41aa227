//! Card lifecycle: one image request derived from one prompt block.
//!
//! ```text
//! pending ──► generating ──┬──► ready ◄──┐
//!                          └──► error    │
//! ready | error ──► regenerating ──┬─────┘
//!                                  └──► error
//! ```
//!
//! Approval is a side flag on a `ready` card. Entering `regenerating` clears
//! it; leaving `regenerating` moves the card to its next version whether the
//! provider succeeded or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::asset::AssetRef;
use super::settings::{BlockKind, PromptBlock};
use crate::error::SpawnerError;

/// Lifecycle state of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    /// Created, waiting for a provider slot.
    Pending,
    /// First provider call in flight.
    Generating,
    /// Provider produced an image for the current version.
    Ready,
    /// Provider (or asset storage) failed for the current version.
    Error,
    /// Follow-up provider call queued or in flight.
    Regenerating,
}

impl CardState {
    /// Returns `true` while the card still waits on the provider.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Generating | Self::Regenerating)
    }

    /// Returns the wire form, e.g. `"regenerating"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Regenerating => "regenerating",
        }
    }
}

/// One independently tracked generation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    index: u32,
    kind: BlockKind,
    prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    state: CardState,
    version: u32,
    approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    asset: Option<AssetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    model_text: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Card {
    /// Creates a `pending` card at version 1 from a prompt block.
    #[must_use]
    pub fn new(index: u32, block: PromptBlock) -> Self {
        let now = Utc::now();
        Self {
            index,
            kind: block.kind,
            prompt: block.text.trim().to_string(),
            reference: block.reference,
            state: CardState::Pending,
            version: 1,
            approved: false,
            asset: None,
            error: None,
            model_text: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Position of the card within its request.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Block kind the card was created from.
    #[must_use]
    pub const fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Prompt text used for the current (or in-flight) version.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Name of the card's own reference image, if any.
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> CardState {
        self.state
    }

    /// Current version, starting at 1.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Version the in-flight provider call will produce.
    #[must_use]
    pub const fn target_version(&self) -> u32 {
        match self.state {
            CardState::Regenerating => self.version.saturating_add(1),
            _ => self.version,
        }
    }

    /// Whether the user approved the current version.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        self.approved
    }

    /// Stored image of the current version.
    #[must_use]
    pub const fn asset(&self) -> Option<&AssetRef> {
        self.asset.as_ref()
    }

    /// Failure detail, present only in the `error` state.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Text parts the provider returned alongside the image.
    #[must_use]
    pub fn model_text(&self) -> &[String] {
        &self.model_text
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Timestamp of the last state change.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// `pending → generating`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::InvalidState`] from any other state.
    pub fn begin_generation(&mut self) -> Result<(), SpawnerError> {
        if self.state != CardState::Pending {
            return Err(self.invalid("start generating"));
        }
        self.transition(CardState::Generating);
        Ok(())
    }

    /// `ready | error → regenerating`, clearing approval.
    ///
    /// The prompt text is kept unless `prompt` replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::InvalidState`] while the card is pending or
    /// already in flight, and [`SpawnerError::Validation`] for a blank
    /// replacement prompt.
    pub fn begin_regeneration(&mut self, prompt: Option<String>) -> Result<(), SpawnerError> {
        if !matches!(self.state, CardState::Ready | CardState::Error) {
            return Err(self.invalid("regenerate"));
        }
        if let Some(text) = prompt {
            let text = text.trim();
            if text.is_empty() && self.kind.capabilities().produces_text {
                return Err(SpawnerError::Validation(
                    "replacement prompt must not be empty".to_string(),
                ));
            }
            self.prompt = text.to_string();
        }
        self.approved = false;
        self.transition(CardState::Regenerating);
        Ok(())
    }

    /// `generating | regenerating → ready` with the stored asset of the
    /// target version.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::InvalidState`] if no provider call is in
    /// flight for this card.
    pub fn complete(&mut self, asset: AssetRef, model_text: Vec<String>) -> Result<(), SpawnerError> {
        if !matches!(self.state, CardState::Generating | CardState::Regenerating) {
            return Err(self.invalid("complete"));
        }
        self.version = self.target_version();
        self.asset = Some(asset);
        self.error = None;
        self.model_text = model_text;
        self.transition(CardState::Ready);
        Ok(())
    }

    /// `generating | regenerating → error`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::InvalidState`] if no provider call is in
    /// flight, and [`SpawnerError::Validation`] for an empty detail.
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), SpawnerError> {
        if !matches!(self.state, CardState::Generating | CardState::Regenerating) {
            return Err(self.invalid("fail"));
        }
        let detail = detail.into();
        if detail.trim().is_empty() {
            return Err(SpawnerError::Validation(
                "error detail must not be empty".to_string(),
            ));
        }
        self.version = self.target_version();
        self.asset = None;
        self.model_text.clear();
        self.error = Some(detail);
        self.transition(CardState::Error);
        Ok(())
    }

    /// Moves a card stranded in an active state to `error`.
    ///
    /// Used when a provider call can no longer report back, e.g. after a
    /// restart. Returns `false` if the card was not active.
    pub fn abandon(&mut self, detail: &str) -> bool {
        match self.state {
            CardState::Pending => {
                self.transition(CardState::Generating);
                self.fail(detail).is_ok()
            }
            CardState::Generating | CardState::Regenerating => self.fail(detail).is_ok(),
            CardState::Ready | CardState::Error => false,
        }
    }

    /// Marks a `ready` card approved.
    ///
    /// Returns `false` if it was already approved.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::InvalidState`] unless the card is `ready`.
    pub fn approve(&mut self) -> Result<bool, SpawnerError> {
        if self.state != CardState::Ready {
            return Err(self.invalid("approve"));
        }
        if self.approved {
            return Ok(false);
        }
        self.approved = true;
        self.updated_at = Utc::now();
        Ok(true)
    }

    fn transition(&mut self, next: CardState) {
        if next != CardState::Error {
            self.error = None;
        }
        self.state = next;
        self.updated_at = Utc::now();
    }

    fn invalid(&self, action: &str) -> SpawnerError {
        SpawnerError::InvalidState(format!(
            "cannot {action} card {} while it is {}",
            self.index,
            self.state.as_str()
        ))
    }
}
