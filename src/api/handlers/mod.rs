//! REST endpoint handlers organized by resource.

pub mod assets;
pub mod generation;
pub mod project;
pub mod references;
pub mod status;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(generation::routes())
        .merge(project::routes())
        .merge(status::routes())
        .merge(references::routes())
        .merge(assets::routes())
}
