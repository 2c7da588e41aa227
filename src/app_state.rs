//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::GenerationService;

/// Default body limit of reference uploads (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Generation service for all business logic.
    pub generation_service: Arc<GenerationService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Body limit of reference uploads, in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Builds the state around a service, sharing its event bus.
    #[must_use]
    pub fn new(generation_service: GenerationService) -> Self {
        let event_bus = generation_service.event_bus().clone();
        Self {
            generation_service: Arc::new(generation_service),
            event_bus,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Overrides the upload body limit.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}
