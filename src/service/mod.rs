//! Service layer: business logic orchestration.
//!
//! [`GenerationService`] owns the job scheduler, the regeneration
//! controller, the approval tracker, the status reporter and the export
//! assembler, and emits events through the [`super::domain::EventBus`].

pub mod batch;
pub mod generation_service;
pub mod status;

pub use batch::{BatchHandle, BatchOutcome};
pub use generation_service::{
    EngineSettings, GenerationService, INTERRUPTED_DETAIL, RestoreSummary, SheetRegeneration,
    Submission,
};
pub use status::{GenerationSummary, StatusReport};
