//! Filing types - raw source items and the canonical filing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw filing item as returned by the ECFS listing source.
///
/// Field names mirror the wire shape so `serde_json` can deserialize API
/// responses directly. Everything is optional; the normalizer owns the
/// mapping into [`FilingRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFiling {
    /// Globally unique submission id (the dedup key against the source).
    #[serde(default)]
    pub id_submission: Option<String>,

    /// When the filing was received, RFC 3339.
    #[serde(default)]
    pub date_received: Option<String>,

    /// Submission type wrapper (`{"description": "APPLICATION"}`).
    #[serde(default)]
    pub submissiontype: Option<RawDescribed>,

    /// Filing status wrapper.
    #[serde(default)]
    pub filingstatus: Option<RawDescribed>,

    /// Proceedings this filing belongs to.
    #[serde(default)]
    pub proceedings: Vec<RawProceeding>,

    /// Filer names as given by the source (person or organization).
    #[serde(default)]
    pub filers: Vec<RawNamed>,

    /// Authors (contact persons) listed on the filing.
    #[serde(default)]
    pub authors: Vec<RawNamed>,

    /// Law firms listed on the filing.
    #[serde(default)]
    pub lawfirms: Vec<RawNamed>,

    /// Attached documents.
    #[serde(default)]
    pub documents: Vec<RawDocument>,
}

/// A `{"description": ...}` wrapper used throughout the source schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDescribed {
    #[serde(default)]
    pub description: Option<String>,
}

/// A `{"name": ...}` wrapper used for filers, authors, and law firms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNamed {
    #[serde(default)]
    pub name: Option<String>,
}

/// A proceeding reference on a raw filing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProceeding {
    /// Docket number, e.g. "WC 24-123".
    #[serde(default)]
    pub name: Option<String>,

    /// Free-text proceeding description. Source of name extraction and
    /// keyword filtering.
    #[serde(default)]
    pub description: Option<String>,
}

/// A document attachment on a raw filing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub filename: Option<String>,

    /// Viewer URL for the document.
    #[serde(default)]
    pub src: Option<String>,
}

/// Submission type of a filing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionType {
    Application,
    Supplement,
    Amendment,
    PublicNotice,
    Comment,
    Withdrawal,
    /// Anything else the source emits, kept verbatim for statistics.
    Other(String),
}

impl SubmissionType {
    /// Parse a source description like "APPLICATION" or "PUBLIC NOTICE".
    pub fn parse(description: &str) -> Self {
        match description.trim().to_uppercase().as_str() {
            "APPLICATION" => Self::Application,
            "SUPPLEMENT" => Self::Supplement,
            "AMENDMENT" => Self::Amendment,
            "PUBLIC NOTICE" => Self::PublicNotice,
            "COMMENT" => Self::Comment,
            "WITHDRAWAL" | "WITHDRAWAL OF PLEADING" => Self::Withdrawal,
            other => Self::Other(other.to_string()),
        }
    }

    /// Source-style label, used in exports.
    pub fn label(&self) -> &str {
        match self {
            Self::Application => "APPLICATION",
            Self::Supplement => "SUPPLEMENT",
            Self::Amendment => "AMENDMENT",
            Self::PublicNotice => "PUBLIC NOTICE",
            Self::Comment => "COMMENT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Other(s) => s,
        }
    }
}

/// A reference to a filed document, carried through the pipeline so the
/// evidence extractor can associate text back to its filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Original filename as given by the source.
    pub filename: String,

    /// Locator (viewer URL) the fetch collaborator understands.
    pub locator: String,

    /// Submission id of the filing this document was attached to.
    pub submission_id: String,

    /// When the owning filing was received.
    pub filed_at: DateTime<Utc>,
}

/// One canonical filing record, produced by the normalizer.
///
/// Immutable once created: later stages read filings but never rewrite
/// them. `submission_id` is globally unique within a run's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingRecord {
    /// Unique key for dedup against the raw source.
    pub submission_id: String,

    /// When the filing was received.
    pub received_at: DateTime<Utc>,

    /// Parsed submission type.
    pub submission_type: SubmissionType,

    /// Docket id (proceeding name), empty when the source gave none.
    pub docket_id: String,

    /// Concatenated proceeding descriptions; source of name extraction
    /// and keyword filtering.
    pub description_text: String,

    /// Raw filer name strings, in source order.
    pub filers: Vec<String>,

    /// Author (contact person) names.
    pub author_names: Vec<String>,

    /// Law firm names.
    pub law_firm_names: Vec<String>,

    /// Attached documents.
    pub document_refs: Vec<DocumentRef>,

    /// Filing status description, kept for context exports.
    pub status: Option<String>,
}

impl FilingRecord {
    /// First filer name, if any.
    pub fn primary_filer(&self) -> Option<&str> {
        self.filers.first().map(|s| s.as_str())
    }

    /// Whether this filing carries any text or documents at all.
    ///
    /// A record with neither can never pass the inclusion filter.
    pub fn has_content(&self) -> bool {
        !self.description_text.is_empty() || !self.document_refs.is_empty()
    }
}
