//! Domain layer: cards, records, projects, and the event system.
//!
//! This module contains the server-side domain model: request and project
//! identity, generation settings, the card state machine, the persisted
//! generation record, the project archive stack, the registries holding
//! them behind per-entity locks, and the event bus broadcasting changes.

pub mod asset;
pub mod card;
pub mod event_bus;
pub mod generation_event;
pub mod generation_registry;
pub mod ids;
pub mod intake;
pub mod project;
pub mod prompt_file;
pub mod record;
pub mod settings;

pub use asset::AssetRef;
pub use card::{Card, CardState};
pub use event_bus::EventBus;
pub use generation_event::GenerationEvent;
pub use generation_registry::{GenerationRegistry, RecordHandle};
pub use ids::{ProjectId, RequestId};
pub use intake::GenerationIntake;
pub use project::{ArchiveEntry, ExportMarker, ProjectData, ProjectRegistry};
pub use prompt_file::parse_prompt_yaml;
pub use record::{CardCounts, GenerationRecord, GenerationRequest, RequestStatus};
pub use settings::{AspectRatio, BlockKind, Capabilities, PromptBlock, Resolution};
