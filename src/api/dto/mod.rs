//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain types stay free of HTTP concerns; handlers convert between them
//! and the wire shapes defined here.

pub mod common_dto;
pub mod generation_dto;
pub mod project_dto;
pub mod status_dto;

pub use common_dto::*;
pub use generation_dto::*;
pub use project_dto::*;
pub use status_dto::*;
