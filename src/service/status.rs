//! Read-only status snapshot across all generations.

use chrono::{DateTime, Utc};

use crate::domain::{
    AspectRatio, Card, CardCounts, GenerationRecord, ProjectId, RequestId, RequestStatus,
    Resolution,
};

/// Summary of one generation in a status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Request identifier.
    pub request_id: RequestId,
    /// Owning project, if any.
    pub project_id: Option<ProjectId>,
    /// First line of the first prompt.
    pub title: String,
    /// Aggregate status.
    pub status: RequestStatus,
    /// Shared aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Shared resolution.
    pub resolution: Resolution,
    /// Intake timestamp.
    pub created_at: DateTime<Utc>,
    /// Last persisted change.
    pub updated_at: DateTime<Utc>,
    /// Record revision.
    pub revision: u64,
    /// Per-state card counts.
    pub counts: CardCounts,
    /// Every card, by index.
    pub cards: Vec<Card>,
}

impl From<&GenerationRecord> for GenerationSummary {
    fn from(record: &GenerationRecord) -> Self {
        Self {
            request_id: record.id(),
            project_id: record.request.project_id,
            title: record.request.title(),
            status: record.status(),
            aspect_ratio: record.request.aspect_ratio,
            resolution: record.request.resolution,
            created_at: record.request.created_at,
            updated_at: record.updated_at(),
            revision: record.revision(),
            counts: record.counts(),
            cards: record.cards().to_vec(),
        }
    }
}

/// Consistent snapshot of every generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Card counts across all generations.
    pub totals: CardCounts,
    /// Generations, newest first.
    pub generations: Vec<GenerationSummary>,
}

impl StatusReport {
    /// Builds a report from records already locked for reading.
    pub(crate) fn from_records<'a>(records: impl IntoIterator<Item = &'a GenerationRecord>) -> Self {
        let mut totals = CardCounts::default();
        let mut generations: Vec<GenerationSummary> = records
            .into_iter()
            .map(|record| {
                let summary = GenerationSummary::from(record);
                totals.merge(&summary.counts);
                summary
            })
            .collect();
        generations.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.request_id.cmp(&a.request_id))
        });
        Self {
            totals,
            generations,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::record::tests::make_request;

    #[test]
    fn totals_sum_over_generations_newest_first() {
        let older = GenerationRecord::new(make_request(&["one", "two"]));
        let mut newer_request = make_request(&["three"]);
        newer_request.created_at = older.request.created_at + chrono::Duration::seconds(5);
        let newer = GenerationRecord::new(newer_request);

        let report = StatusReport::from_records([&older, &newer]);
        assert_eq!(report.totals.total, 3);
        assert_eq!(report.totals.active, 3);
        assert_eq!(report.totals.completed, 0);
        let titles: Vec<&str> = report.generations.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "one"]);
    }

    #[test]
    fn empty_report() {
        let report = StatusReport::from_records(std::iter::empty::<&GenerationRecord>());
        assert_eq!(report, StatusReport::default());
    }
}
