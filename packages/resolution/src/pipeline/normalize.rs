//! Filing normalizer - raw source items to canonical records.
//!
//! Two responsibilities: dedupe raw items by submission id (the listing
//! source returns overlapping results across queries), and apply the
//! inclusion filter that separates numbering-authorization filings from
//! the rest of the docket traffic. Rejections are counted, never silently
//! dropped.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use crate::types::filing::{DocumentRef, FilingRecord, RawFiling, SubmissionType};

/// Proceeding-description phrases that mark a filing as in scope.
/// Matched case-insensitively as substrings.
const INCLUSION_PHRASES: [&str; 3] = [
    "interconnected voip numbering",
    "voip numbering authorization application",
    "authorization to obtain numbering resources",
];

/// Document-filename marker that also marks a filing as in scope.
const FILENAME_MARKER: &str = "voip numbering";

/// Outcome of normalizing one raw item.
#[derive(Debug)]
pub enum NormalizeOutcome {
    Kept(FilingRecord),
    /// Failed the inclusion filter.
    Rejected,
    /// Missing the fields a record cannot exist without.
    Malformed,
}

/// Whether a raw filing passes the inclusion filter.
pub fn passes_inclusion_filter(raw: &RawFiling) -> bool {
    for proceeding in &raw.proceedings {
        if let Some(desc) = &proceeding.description {
            let desc = desc.to_lowercase();
            if INCLUSION_PHRASES.iter().any(|p| desc.contains(p)) {
                return true;
            }
        }
    }

    raw.documents.iter().any(|doc| {
        doc.filename
            .as_deref()
            .is_some_and(|f| f.to_lowercase().contains(FILENAME_MARKER))
    })
}

/// Map a raw item into the canonical schema and apply the inclusion
/// filter.
pub fn normalize_one(raw: &RawFiling) -> NormalizeOutcome {
    let Some(submission_id) = raw.id_submission.as_deref().filter(|s| !s.is_empty()) else {
        return NormalizeOutcome::Malformed;
    };

    let Some(received_at) = raw
        .date_received
        .as_deref()
        .and_then(parse_received_timestamp)
    else {
        return NormalizeOutcome::Malformed;
    };

    if !passes_inclusion_filter(raw) {
        return NormalizeOutcome::Rejected;
    }

    let submission_type = raw
        .submissiontype
        .as_ref()
        .and_then(|s| s.description.as_deref())
        .map(SubmissionType::parse)
        .unwrap_or(SubmissionType::Other("UNKNOWN".to_string()));

    // First proceeding name is the docket id; descriptions concatenate so
    // the name resolver sees every phrase the source gave us.
    let docket_id = raw
        .proceedings
        .iter()
        .find_map(|p| p.name.clone())
        .unwrap_or_default();

    let description_text = raw
        .proceedings
        .iter()
        .filter_map(|p| p.description.as_deref())
        .collect::<Vec<_>>()
        .join(" | ");

    let document_refs = raw
        .documents
        .iter()
        .filter_map(|doc| {
            Some(DocumentRef {
                filename: doc.filename.clone()?,
                locator: doc.src.clone()?,
                submission_id: submission_id.to_string(),
                filed_at: received_at,
            })
        })
        .collect();

    NormalizeOutcome::Kept(FilingRecord {
        submission_id: submission_id.to_string(),
        received_at,
        submission_type,
        docket_id,
        description_text,
        filers: collect_names(&raw.filers),
        author_names: collect_names(&raw.authors),
        law_firm_names: collect_names(&raw.lawfirms),
        document_refs,
        status: raw
            .filingstatus
            .as_ref()
            .and_then(|s| s.description.clone()),
    })
}

/// Counts produced by a normalization pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizeStats {
    pub raw_count: usize,
    pub duplicate_count: usize,
    pub kept_count: usize,
    pub rejected_count: usize,
    pub malformed_count: usize,
}

/// Dedupe raw items by submission id, then normalize and filter.
///
/// Last write wins on duplicate ids; content is immutable per id, so the
/// choice only matters for counting. Output order follows first
/// appearance in the input.
pub fn normalize_batch(raw_filings: Vec<RawFiling>) -> (Vec<FilingRecord>, NormalizeStats) {
    let mut stats = NormalizeStats {
        raw_count: raw_filings.len(),
        ..Default::default()
    };

    let mut by_id: IndexMap<String, RawFiling> = IndexMap::new();
    let mut malformed = Vec::new();
    for raw in raw_filings {
        match raw.id_submission.as_deref().filter(|s| !s.is_empty()) {
            Some(id) => {
                if by_id.insert(id.to_string(), raw).is_some() {
                    stats.duplicate_count += 1;
                }
            }
            None => malformed.push(raw),
        }
    }

    let mut records = Vec::with_capacity(by_id.len());
    for raw in by_id.values().chain(malformed.iter()) {
        match normalize_one(raw) {
            NormalizeOutcome::Kept(record) => {
                stats.kept_count += 1;
                records.push(record);
            }
            NormalizeOutcome::Rejected => stats.rejected_count += 1,
            NormalizeOutcome::Malformed => stats.malformed_count += 1,
        }
    }

    debug!(
        raw = stats.raw_count,
        kept = stats.kept_count,
        rejected = stats.rejected_count,
        duplicates = stats.duplicate_count,
        "normalized filing batch"
    );

    (records, stats)
}

fn parse_received_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    // Source sometimes omits the offset.
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn collect_names(entries: &[crate::types::filing::RawNamed]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|n| n.name.as_deref())
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}
