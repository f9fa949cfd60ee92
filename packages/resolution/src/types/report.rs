//! Run reporting and the rule-engine audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of non-fatal failure, for run-level aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    FetchFailed,
    ExtractionFailed,
    ResolutionAmbiguous,
    SynthesisInvalid,
    SynthesisUnavailable,
    SearchFailed,
}

/// One recorded degradation: which entity or document, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Degradation {
    pub kind: FailureKind,
    /// Entity id, or submission/document locator for pre-aggregation
    /// failures.
    pub subject: String,
    pub detail: String,
}

impl Degradation {
    pub fn new(kind: FailureKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

/// Run-level report surfaced to the operator.
///
/// A completed run always produces one of these, with an itemized list of
/// degraded entities - never a hard stop for per-entity failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Raw items seen by the normalizer.
    pub raw_count: usize,

    /// Records passing the inclusion filter.
    pub kept_count: usize,

    /// Records failing the inclusion filter (monitored output, not
    /// silently dropped).
    pub rejected_count: usize,

    /// Duplicate submission ids collapsed during normalization.
    pub duplicate_count: usize,

    /// Filings excluded because the filer is a government entity.
    pub excluded_government: usize,

    /// Filings excluded for having no filer name at all.
    pub excluded_no_filer: usize,

    /// Entities built by the aggregator.
    pub entity_count: usize,

    /// Entities excluded from the enrichable population (no Application).
    pub non_applicant_count: usize,

    /// Entities skipped by fusion because they already carried enrichment.
    pub fusion_skipped: usize,

    /// Per-entity degradations, in occurrence order.
    pub degradations: Vec<Degradation>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-fatal failure.
    pub fn degrade(&mut self, kind: FailureKind, subject: impl Into<String>, detail: impl Into<String>) {
        self.degradations.push(Degradation {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        });
    }

    /// Count of degradations of a given kind.
    pub fn count(&self, kind: FailureKind) -> usize {
        self.degradations.iter().filter(|d| d.kind == kind).count()
    }

    /// Distinct subjects that degraded during the run.
    pub fn degraded_subjects(&self) -> Vec<&str> {
        let mut subjects: Vec<&str> = self
            .degradations
            .iter()
            .map(|d| d.subject.as_str())
            .collect();
        subjects.sort_unstable();
        subjects.dedup();
        subjects
    }

    /// Fold another stage's report into this one.
    pub fn absorb(&mut self, other: RunReport) {
        self.raw_count += other.raw_count;
        self.kept_count += other.kept_count;
        self.rejected_count += other.rejected_count;
        self.duplicate_count += other.duplicate_count;
        self.excluded_government += other.excluded_government;
        self.excluded_no_filer += other.excluded_no_filer;
        self.entity_count += other.entity_count;
        self.non_applicant_count += other.non_applicant_count;
        self.fusion_skipped += other.fusion_skipped;
        self.degradations.extend(other.degradations);
    }
}

/// One rule-engine correction, persisted for explainability.
///
/// The rule engine is the only stage permitted to overwrite another
/// stage's field, and every overwrite lands here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub entity_id: String,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub rule_id: String,
    pub corrected_at: DateTime<Utc>,
}

impl Correction {
    pub fn new(
        entity_id: impl Into<String>,
        field: impl Into<String>,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        rule_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            field: field.into(),
            old_value: old_value.into(),
            new_value: new_value.into(),
            rule_id: rule_id.into(),
            corrected_at: Utc::now(),
        }
    }
}
