//! Domain events reflecting generation state mutations.
//!
//! Every persisted change emits a [`GenerationEvent`] through the
//! [`super::EventBus`]. Events are broadcast to WebSocket subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::card::CardState;
use super::{ProjectId, RequestId};

/// Domain event emitted after every persisted mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// A request was accepted and its cards created.
    GenerationSubmitted {
        /// Request identifier.
        request_id: RequestId,
        /// Owning project, if any.
        project_id: Option<ProjectId>,
        /// Number of cards created.
        card_count: usize,
        /// Submission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A card moved to a new state.
    CardStateChanged {
        /// Request identifier.
        request_id: RequestId,
        /// Card index.
        index: u32,
        /// New state.
        state: CardState,
        /// Card version after the change.
        version: u32,
        /// Failure detail when `state` is `error`.
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Change timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A ready card was approved.
    CardApproved {
        /// Request identifier.
        request_id: RequestId,
        /// Card index.
        index: u32,
        /// Approved version.
        version: u32,
        /// Approval timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A whole sheet was archived ahead of its regeneration.
    SheetArchived {
        /// Request identifier.
        request_id: RequestId,
        /// Owning project.
        project_id: ProjectId,
        /// Archive depth after the push.
        archive_len: usize,
        /// Archive timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Approved cards were assembled into an artifact.
    ArtifactExported {
        /// Request identifier.
        request_id: RequestId,
        /// Indices included, ascending.
        card_indices: Vec<u32>,
        /// Artifact file name.
        file_name: String,
        /// Export timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl GenerationEvent {
    /// Returns the request ID associated with this event.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::GenerationSubmitted { request_id, .. }
            | Self::CardStateChanged { request_id, .. }
            | Self::CardApproved { request_id, .. }
            | Self::SheetArchived { request_id, .. }
            | Self::ArtifactExported { request_id, .. } => *request_id,
        }
    }

    /// Returns the owning project when the event names one.
    #[must_use]
    pub const fn project_id(&self) -> Option<ProjectId> {
        match self {
            Self::GenerationSubmitted { project_id, .. } => *project_id,
            Self::SheetArchived { project_id, .. } => Some(*project_id),
            Self::CardStateChanged { .. }
            | Self::CardApproved { .. }
            | Self::ArtifactExported { .. } => None,
        }
    }

    /// Returns the event timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::GenerationSubmitted { timestamp, .. }
            | Self::CardStateChanged { timestamp, .. }
            | Self::CardApproved { timestamp, .. }
            | Self::SheetArchived { timestamp, .. }
            | Self::ArtifactExported { timestamp, .. } => *timestamp,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::GenerationSubmitted { .. } => "generation_submitted",
            Self::CardStateChanged { .. } => "card_state_changed",
            Self::CardApproved { .. } => "card_approved",
            Self::SheetArchived { .. } => "sheet_archived",
            Self::ArtifactExported { .. } => "artifact_exported",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn card_state_changed_serializes_with_tag() {
        let event = GenerationEvent::CardStateChanged {
            request_id: RequestId::new(),
            index: 2,
            state: CardState::Regenerating,
            version: 1,
            error: None,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "card_state_changed");
        let Ok(json) = serde_json::to_string(&event) else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"event_type\":\"card_state_changed\""));
        assert!(json.contains("\"state\":\"regenerating\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn request_id_accessor() {
        let id = RequestId::new();
        let event = GenerationEvent::ArtifactExported {
            request_id: id,
            card_indices: vec![0, 2],
            file_name: format!("{id}.zip"),
            timestamp: Utc::now(),
        };
        assert_eq!(event.request_id(), id);
        assert_eq!(event.event_type_str(), "artifact_exported");
    }
}
