//! Entity types - the deduplicated company aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::types::enrichment::StructuredEnrichment;
use crate::types::filing::{DocumentRef, FilingRecord};
use crate::types::signals::FilingSignals;

/// How the filer behind an entity was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilerType {
    Corporate,
    Individual,
    #[default]
    Unknown,
}

/// A person extracted from application documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personnel {
    pub name: String,
    pub title: Option<String>,
}

impl Personnel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Contact and background fields extracted from an entity's documents.
///
/// Every field is independent and best-effort: absence of the anchor
/// section in the document text yields `None`, not an error. All values
/// carry the implicit source tag "document".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    /// Normalized to 10 digits.
    pub phone: Option<String>,
    pub email: Option<String>,
    pub personnel: Vec<Personnel>,
    /// Four-digit founding year, first plausible match wins.
    pub founding_year: Option<u16>,
    /// Sentence around an "interconnected VoIP" mention.
    pub service_description: Option<String>,
}

impl ExtractedFields {
    /// Whether anything at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.personnel.is_empty()
            && self.founding_year.is_none()
            && self.service_description.is_none()
    }
}

/// A deduplicated company-level aggregate of one or more filings.
///
/// Created once by the aggregator, then incrementally enriched: the
/// evidence extractor fills `extracted_fields`, the signal deriver fills
/// `filing_signals`, the fusion adapter fills `enrichment`, and the rule
/// engine may correct `canonical_name`/`personnel`/`market_position` -
/// every such correction is written to the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Stable id derived from the normalized name; identical across
    /// re-runs over the same input.
    pub entity_id: String,

    /// Best-known display name. May be rewritten by the rule engine.
    pub canonical_name: String,

    /// Normalized grouping key the entity was clustered under.
    pub normalized_name: String,

    /// "Doing business as" name split from the canonical name, if any.
    pub dba_name: Option<String>,

    /// Every raw filer name observed across constituent filings.
    pub name_variants: BTreeSet<String>,

    /// Classification of the filer behind this entity.
    pub filer_type: FilerType,

    /// Docket ids across constituent filings (administrative inboxes
    /// excluded).
    pub dockets: BTreeSet<String>,

    /// Min/max received-at over constituent filings.
    pub first_filing_at: DateTime<Utc>,
    pub last_filing_at: DateTime<Utc>,

    /// Constituent filings with submission type Application, ordered by
    /// date. The earliest per docket is "the application record".
    pub application_filings: Vec<FilingRecord>,

    /// All other constituent filings, retained for context and status
    /// derivation.
    pub related_filings: Vec<FilingRecord>,

    /// Union of document refs over constituent filings.
    pub document_refs: Vec<DocumentRef>,

    /// Author (contact person) names across filings.
    pub contact_names: BTreeSet<String>,

    /// Law firms across filings.
    pub law_firms: BTreeSet<String>,

    /// Distinct proceeding descriptions, kept for the rule engine's
    /// secondary name extraction.
    pub proceeding_descriptions: BTreeSet<String>,

    /// Fields extracted from document text (stage 4).
    pub extracted_fields: Option<ExtractedFields>,

    /// Derived activity heuristics (stage 5).
    pub filing_signals: Option<FilingSignals>,

    /// Fused enrichment (stage 6/7).
    pub enrichment: Option<StructuredEnrichment>,
}

impl Entity {
    /// Derive the stable entity id from a normalized name.
    ///
    /// First 16 hex chars of SHA-256; deterministic across re-runs.
    pub fn derive_id(normalized_name: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalized_name.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }

    /// All constituent filings, applications first.
    pub fn all_filings(&self) -> impl Iterator<Item = &FilingRecord> {
        self.application_filings
            .iter()
            .chain(self.related_filings.iter())
    }

    /// Total constituent filing count.
    pub fn filing_count(&self) -> usize {
        self.application_filings.len() + self.related_filings.len()
    }

    /// Whether this entity belongs to the enrichable population
    /// (filed at least one Application).
    pub fn is_applicant(&self) -> bool {
        !self.application_filings.is_empty()
    }

    /// The earliest application filing for a docket, if any.
    pub fn application_record(&self, docket_id: &str) -> Option<&FilingRecord> {
        self.application_filings
            .iter()
            .filter(|f| f.docket_id == docket_id)
            .min_by_key(|f| f.received_at)
    }

    /// Whether the fusion stage already produced enrichment for this
    /// entity (idempotent re-run check).
    pub fn is_enriched(&self) -> bool {
        self.enrichment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_id_deterministic() {
        let a = Entity::derive_id("ulec");
        let b = Entity::derive_id("ulec");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, Entity::derive_id("bandwidthcom"));
    }

    #[test]
    fn test_extracted_fields_is_empty() {
        let mut fields = ExtractedFields::default();
        assert!(fields.is_empty());

        fields.email = Some("ops@example.com".into());
        assert!(!fields.is_empty());
    }
}
