//! Record store: durable filesystem persistence under one data root.
//!
//! ```text
//! <root>/
//!   generations/<request-id>/record.json
//!   generations/<request-id>/cards/card-<index>-v<version>.<ext>
//!   projects/<project-id>.json
//!   references/<sha256>.<ext>
//!   exports/<request-id>.zip
//! ```
//!
//! Card assets are content-addressed by `(request id, index, version)` and
//! are never overwritten. Sidecars are replaced atomically.

pub mod record_store;

pub use record_store::RecordStore;
