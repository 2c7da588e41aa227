//! Status DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::generation_dto::GenerationDto;
use crate::domain::CardCounts;
use crate::service::StatusReport;

/// Response body for `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Card counts across every generation.
    pub progress: CardCounts,
    /// Generations, newest first.
    pub generations: Vec<GenerationDto>,
}

impl From<StatusReport> for StatusResponse {
    fn from(report: StatusReport) -> Self {
        Self {
            progress: report.totals,
            generations: report
                .generations
                .into_iter()
                .map(GenerationDto::from)
                .collect(),
        }
    }
}
