//! Engine error types with HTTP status code mapping.
//!
//! [`SpawnerError`] is the central error type. Each variant maps to a
//! machine-readable [`ErrorKind`], a numeric code and an HTTP status, and
//! renders as a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ProjectId, RequestId};
use crate::provider::ProviderError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "kind": "InvalidStateError",
///     "code": 2101,
///     "message": "invalid state: cannot approve card 1 while it is generating",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with kind, numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub kind: ErrorKind,
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Machine-readable error category exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ErrorKind {
    /// Malformed input; nothing was created.
    ValidationError,
    /// Unknown request, card, project, archive entry or asset.
    NotFoundError,
    /// Operation not allowed in the card's current state.
    InvalidStateError,
    /// Operation requires something that is not there yet.
    PreconditionError,
    /// External generation provider failed.
    ProviderError,
    /// Record store read or write failed.
    StorageError,
}

/// Engine error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category                       | HTTP Status          |
/// |-----------|--------------------------------|----------------------|
/// | 1000–1999 | Validation                     | 400 Bad Request      |
/// | 2000–2099 | Not found                      | 404 Not Found        |
/// | 2100–2199 | State / precondition           | 409 / 412            |
/// | 3000–3999 | Storage / internal             | 500                  |
/// | 4000–4999 | Provider                       | 502 Bad Gateway      |
#[derive(Debug, thiserror::Error)]
pub enum SpawnerError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Generation request with the given ID was not found.
    #[error("generation not found: {0}")]
    RequestNotFound(RequestId),

    /// Card index does not exist in the request.
    #[error("card {index} not found in generation {request_id}")]
    CardNotFound {
        /// Owning request.
        request_id: RequestId,
        /// Requested card index.
        index: u32,
    },

    /// Project with the given ID was not found.
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// Project has no current generation to regenerate.
    #[error("project {0} has no current generation")]
    NoCurrentGeneration(ProjectId),

    /// Archive position out of range.
    #[error("archive entry {position} not found in project {project_id}")]
    ArchiveEntryNotFound {
        /// Owning project.
        project_id: ProjectId,
        /// Requested position (0 = newest).
        position: usize,
    },

    /// Named reference image is not in the store.
    #[error("reference image not found: {0}")]
    ReferenceNotFound(String),

    /// Stored asset does not exist.
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// Transition not allowed from the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Operation precondition not met.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Error returned by the image provider.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Record store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SpawnerError {
    /// Returns the machine-readable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::RequestNotFound(_)
            | Self::CardNotFound { .. }
            | Self::ProjectNotFound(_)
            | Self::NoCurrentGeneration(_)
            | Self::ArchiveEntryNotFound { .. }
            | Self::ReferenceNotFound(_)
            | Self::AssetNotFound(_) => ErrorKind::NotFoundError,
            Self::InvalidState(_) => ErrorKind::InvalidStateError,
            Self::Precondition(_) => ErrorKind::PreconditionError,
            Self::Provider(_) => ErrorKind::ProviderError,
            Self::Storage(_) | Self::Internal(_) => ErrorKind::StorageError,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::RequestNotFound(_) => 2001,
            Self::CardNotFound { .. } => 2002,
            Self::ProjectNotFound(_) => 2003,
            Self::NoCurrentGeneration(_) => 2004,
            Self::ArchiveEntryNotFound { .. } => 2005,
            Self::ReferenceNotFound(_) => 2006,
            Self::AssetNotFound(_) => 2007,
            Self::InvalidState(_) => 2101,
            Self::Precondition(_) => 2102,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
            Self::Provider(_) => 4001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::NotFoundError => StatusCode::NOT_FOUND,
            ErrorKind::InvalidStateError => StatusCode::CONFLICT,
            ErrorKind::PreconditionError => StatusCode::PRECONDITION_FAILED,
            ErrorKind::ProviderError => StatusCode::BAD_GATEWAY,
            ErrorKind::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<std::io::Error> for SpawnerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SpawnerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("sidecar encoding: {err}"))
    }
}

impl IntoResponse for SpawnerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            Self::Provider(ProviderError::Api { status, .. }) => {
                Some(format!("provider status {status}"))
            }
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                kind: self.kind(),
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
