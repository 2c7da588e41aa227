//! # sheet-spawner
//!
//! Generation job and versioning engine for prompt-sheet image generation.
//!
//! A submission turns an ordered list of prompt blocks into cards, one per
//! block, and dispatches one image-provider call per card with bounded
//! concurrency. Cards can be regenerated one at a time or as a whole
//! sheet (archiving the previous sheet first), approved, and exported as
//! a ZIP archive. All state lives in a filesystem record store and
//! survives restarts.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── GenerationService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── GenerationRegistry / ProjectRegistry (domain/)
//!     ├── ImageProvider (provider/)
//!     ├── ArtifactBuilder (export/)
//!     │
//!     └── RecordStore (storage/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod provider;
pub mod service;
pub mod storage;
pub mod ws;
