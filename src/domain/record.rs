//! Generation requests and their persisted records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::card::{Card, CardState};
use super::settings::{AspectRatio, PromptBlock, Resolution};
use super::{ProjectId, RequestId};
use crate::error::SpawnerError;
use crate::provider::ProviderCredential;

/// A batch of cards submitted together with shared settings.
///
/// Immutable after intake. The provider credential is held in memory only
/// and is never written to the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Request identifier.
    pub id: RequestId,
    /// Intake timestamp.
    pub created_at: DateTime<Utc>,
    /// Shared aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Shared resolution.
    pub resolution: Resolution,
    /// Ordered prompt blocks; block `i` produced card `i`.
    pub blocks: Vec<PromptBlock>,
    /// Owning project, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    /// Reference images sent with every card.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Credential supplied at intake.
    #[serde(skip)]
    pub credential: Option<ProviderCredential>,
}

impl GenerationRequest {
    /// Display title: the first line of the first prompt block.
    #[must_use]
    pub fn title(&self) -> String {
        self.blocks
            .iter()
            .find_map(|b| b.text.lines().map(str::trim).find(|l| !l.is_empty()))
            .map_or_else(|| format!("Generation {}", self.id), str::to_string)
    }
}

/// Aggregate status of a whole request, derived from its cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// At least one card is regenerating.
    Regenerating,
    /// At least one card is pending or generating.
    Generating,
    /// Nothing in flight, at least one card failed.
    Error,
    /// Every card is ready and approved.
    Approved,
    /// Every card is ready.
    Ready,
}

/// Card counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CardCounts {
    /// Cards counted.
    pub total: usize,
    /// `ready` + `error`.
    pub completed: usize,
    /// `pending` + `generating` + `regenerating`.
    pub active: usize,
    /// Cards in `pending`.
    pub pending: usize,
    /// Cards in `generating`.
    pub generating: usize,
    /// Cards in `regenerating`.
    pub regenerating: usize,
    /// Cards in `ready`.
    pub ready: usize,
    /// Cards in `error`.
    pub error: usize,
    /// Ready cards carrying the approval flag.
    pub approved: usize,
}

impl CardCounts {
    /// Adds one card to the tally.
    pub fn add(&mut self, card: &Card) {
        self.total += 1;
        match card.state() {
            CardState::Pending => self.pending += 1,
            CardState::Generating => self.generating += 1,
            CardState::Regenerating => self.regenerating += 1,
            CardState::Ready => self.ready += 1,
            CardState::Error => self.error += 1,
        }
        if card.state().is_active() {
            self.active += 1;
        } else {
            self.completed += 1;
        }
        if card.is_approved() {
            self.approved += 1;
        }
    }

    /// Merges another tally into this one.
    pub fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.completed += other.completed;
        self.active += other.active;
        self.pending += other.pending;
        self.generating += other.generating;
        self.regenerating += other.regenerating;
        self.ready += other.ready;
        self.error += other.error;
        self.approved += other.approved;
    }
}

/// Sidecar for one request: its settings plus a snapshot of every card.
///
/// This is the sole source of truth read by the status reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Request settings.
    pub request: GenerationRequest,
    cards: Vec<Card>,
    revision: u64,
    updated_at: DateTime<Utc>,
}

impl GenerationRecord {
    /// Builds the initial record, one `pending` card per block.
    #[must_use]
    pub fn new(request: GenerationRequest) -> Self {
        let cards = request
            .blocks
            .iter()
            .cloned()
            .zip(0u32..)
            .map(|(block, index)| Card::new(index, block))
            .collect();
        Self {
            updated_at: request.created_at,
            request,
            cards,
            revision: 0,
        }
    }

    /// Request identifier.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.request.id
    }

    /// Cards ordered by index.
    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Number of persisted mutations applied to this record.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Timestamp of the last persisted mutation.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Looks up a card by index.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::CardNotFound`] for an unknown index.
    pub fn card(&self, index: u32) -> Result<&Card, SpawnerError> {
        self.cards
            .iter()
            .find(|c| c.index() == index)
            .ok_or(SpawnerError::CardNotFound {
                request_id: self.request.id,
                index,
            })
    }

    /// Looks up a card by index for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnerError::CardNotFound`] for an unknown index.
    pub fn card_mut(&mut self, index: u32) -> Result<&mut Card, SpawnerError> {
        let request_id = self.request.id;
        self.cards
            .iter_mut()
            .find(|c| c.index() == index)
            .ok_or(SpawnerError::CardNotFound { request_id, index })
    }

    /// Mutable access to every card.
    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.iter_mut()
    }

    /// Marks the record as changed. Called once per persisted mutation.
    pub fn touch(&mut self) {
        self.revision = self.revision.saturating_add(1);
        self.updated_at = Utc::now();
    }

    /// Card counts by state.
    #[must_use]
    pub fn counts(&self) -> CardCounts {
        let mut counts = CardCounts::default();
        for card in &self.cards {
            counts.add(card);
        }
        counts
    }

    /// Aggregate status; in-flight work wins over failures, failures over
    /// completion.
    #[must_use]
    pub fn status(&self) -> RequestStatus {
        let counts = self.counts();
        if counts.regenerating > 0 {
            RequestStatus::Regenerating
        } else if counts.pending + counts.generating > 0 {
            RequestStatus::Generating
        } else if counts.error > 0 {
            RequestStatus::Error
        } else if counts.total > 0 && counts.approved == counts.total {
            RequestStatus::Approved
        } else {
            RequestStatus::Ready
        }
    }

    /// Approved cards ordered by index ascending.
    #[must_use]
    pub fn approved_cards(&self) -> Vec<&Card> {
        let mut approved: Vec<&Card> = self.cards.iter().filter(|c| c.is_approved()).collect();
        approved.sort_by_key(|c| c.index());
        approved
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::AssetRef;

    pub(crate) fn make_request(prompts: &[&str]) -> GenerationRequest {
        GenerationRequest {
            id: RequestId::new(),
            created_at: Utc::now(),
            aspect_ratio: AspectRatio::Square,
            resolution: Resolution::OneK,
            blocks: prompts.iter().map(|p| PromptBlock::text(*p)).collect(),
            project_id: None,
            references: Vec::new(),
            credential: None,
        }
    }

    fn finish(record: &mut GenerationRecord, index: u32, ok: bool) {
        let id = record.id();
        let Ok(card) = record.card_mut(index) else {
            panic!("card {index} missing");
        };
        assert!(card.begin_generation().is_ok());
        if ok {
            let asset = AssetRef::for_card(id, index, card.target_version(), "png");
            assert!(card.complete(asset, Vec::new()).is_ok());
        } else {
            assert!(card.fail("provider error").is_ok());
        }
    }

    #[test]
    fn new_record_has_one_pending_card_per_block() {
        let record = GenerationRecord::new(make_request(&["a", "b", "c"]));
        assert_eq!(record.cards().len(), 3);
        let indices: Vec<u32> = record.cards().iter().map(Card::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(record.cards().iter().all(|c| c.state() == CardState::Pending));
        assert_eq!(record.status(), RequestStatus::Generating);
        assert_eq!(record.revision(), 0);
    }

    #[test]
    fn unknown_card_is_not_found() {
        let mut record = GenerationRecord::new(make_request(&["a"]));
        assert!(matches!(
            record.card(7),
            Err(SpawnerError::CardNotFound { index: 7, .. })
        ));
        assert!(record.card_mut(1).is_err());
    }

    #[test]
    fn counts_and_status_follow_cards() {
        let mut record = GenerationRecord::new(make_request(&["a", "b", "c"]));
        finish(&mut record, 0, true);
        finish(&mut record, 1, false);
        let counts = record.counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.active, 1);
        assert_eq!(record.status(), RequestStatus::Generating);

        finish(&mut record, 2, true);
        assert_eq!(record.status(), RequestStatus::Error);
        assert_eq!(record.counts().active, 0);
    }

    #[test]
    fn all_approved_reports_approved() {
        let mut record = GenerationRecord::new(make_request(&["a", "b"]));
        finish(&mut record, 0, true);
        finish(&mut record, 1, true);
        assert_eq!(record.status(), RequestStatus::Ready);
        for index in [0, 1] {
            let Ok(card) = record.card_mut(index) else {
                panic!("card missing");
            };
            assert!(card.approve().is_ok());
        }
        assert_eq!(record.status(), RequestStatus::Approved);
        assert_eq!(record.counts().approved, 2);
    }

    #[test]
    fn approved_cards_are_ordered_by_index() {
        let mut record = GenerationRecord::new(make_request(&["a", "b", "c"]));
        for index in [2, 0, 1] {
            finish(&mut record, index, true);
        }
        for index in [2, 0] {
            let Ok(card) = record.card_mut(index) else {
                panic!("card missing");
            };
            assert!(card.approve().is_ok());
        }
        let order: Vec<u32> = record.approved_cards().iter().map(|c| c.index()).collect();
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn title_uses_first_non_empty_line() {
        let request = make_request(&["\n  Cover page\nwith details", "second"]);
        assert_eq!(request.title(), "Cover page");
        let untitled = make_request(&[]);
        assert!(untitled.title().starts_with("Generation "));
    }

    #[test]
    fn touch_bumps_revision() {
        let mut record = GenerationRecord::new(make_request(&["a"]));
        record.touch();
        record.touch();
        assert_eq!(record.revision(), 2);
    }

    #[test]
    fn credential_is_not_persisted() {
        let mut request = make_request(&["a"]);
        request.credential = Some(ProviderCredential::new("secret-key"));
        let record = GenerationRecord::new(request);
        let Ok(json) = serde_json::to_string(&record) else {
            panic!("serialization failed");
        };
        assert!(!json.contains("secret-key"));
        let Ok(back) = serde_json::from_str::<GenerationRecord>(&json) else {
            panic!("deserialization failed");
        };
        assert!(back.request.credential.is_none());
    }
}
