//! Filing signals - activity heuristics derived from filing metadata alone.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::filing::SubmissionType;

/// Activity indicators computed from an entity's aggregated filings.
///
/// Pure derivation, no I/O. Re-running at a different point in time only
/// changes `recent_activity`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingSignals {
    pub total_filings: usize,
    pub application_count: usize,
    pub has_supplements: bool,
    pub has_amendments: bool,
    pub docket_count: usize,

    /// Span between first and last filing, in fractional years.
    pub years_active: Option<f64>,

    /// Whether the last filing falls within the recency window of the
    /// pipeline run time.
    pub recent_activity: bool,
}

impl FilingSignals {
    /// Derive signals from an entity's already-aggregated fields.
    pub fn derive(entity: &crate::types::entity::Entity, now: DateTime<Utc>, recency_window: Duration) -> Self {
        let has_supplements = entity
            .all_filings()
            .any(|f| f.submission_type == SubmissionType::Supplement);
        let has_amendments = entity
            .all_filings()
            .any(|f| f.submission_type == SubmissionType::Amendment);

        let span_days = (entity.last_filing_at - entity.first_filing_at).num_days();
        let years_active = if span_days >= 0 {
            Some((span_days as f64 / 365.0 * 10.0).round() / 10.0)
        } else {
            None
        };

        Self {
            total_filings: entity.filing_count(),
            application_count: entity.application_filings.len(),
            has_supplements,
            has_amendments,
            docket_count: entity.dockets.len(),
            years_active,
            recent_activity: now - entity.last_filing_at < recency_window,
        }
    }
}
