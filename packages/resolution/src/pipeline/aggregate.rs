//! Entity aggregator - groups filings into deduplicated company records.
//!
//! Grouping key is the normalized candidate name. Normalization is
//! deterministic so re-running aggregation over the same filing set
//! reproduces the same entity set with the same ids.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::pipeline::resolve::{self, ResolvedName};
use crate::types::entity::{Entity, FilerType};
use crate::types::filing::{FilingRecord, SubmissionType};

/// Administrative inbox dockets; never meaningful as an entity's docket.
const EXCLUDED_DOCKETS: [&str; 2] = ["INBOX-52.15", "INBOX-1.41"];

/// Organizational suffixes stripped as whole trailing tokens during
/// normalization. Suffix punctuation variants collapse first ("l.l.c."
/// and "llc" both strip), so "ULEC, LLC" and "ULEC L.L.C." share a key.
const ORG_SUFFIXES: [&str; 8] = ["llc", "inc", "corp", "llp", "lp", "ltd", "co", "pllc"];

static DBA_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^(.+?)\s+d/?b/?a\s+(.+)$").unwrap(),
        Regex::new(r"(?i)^(.+?)\s+doing\s+business\s+as\s+(.+)$").unwrap(),
    ]
});

/// Normalize a company name into the entity grouping key.
///
/// lowercase -> strip org suffixes as whole trailing tokens -> remove
/// punctuation -> collapse whitespace -> trim.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();

    // Tokenize on whitespace, treating punctuation-only differences in
    // the suffix ("inc." vs "inc", ", llc" vs " llc") as equal.
    let mut tokens: Vec<String> = lowered
        .split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|t| !t.is_empty())
        .collect();

    while let Some(last) = tokens.last() {
        if ORG_SUFFIXES.contains(&last.as_str()) {
            tokens.pop();
        } else {
            break;
        }
    }

    tokens.join(" ")
}

/// Split a "Company d/b/a Brand" name into (primary, Some(dba)).
pub fn extract_dba(name: &str) -> (String, Option<String>) {
    for pattern in DBA_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(name) {
            let primary = captures.get(1).map(|m| m.as_str().trim().to_string());
            let dba = captures.get(2).map(|m| m.as_str().trim().to_string());
            if let (Some(primary), Some(dba)) = (primary, dba) {
                return (primary, Some(dba));
            }
        }
    }
    (name.to_string(), None)
}

/// Counts produced by an aggregation pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregateStats {
    pub total_filings: usize,
    pub excluded_government: usize,
    pub excluded_no_filer: usize,
    pub entity_count: usize,
    pub non_applicant_count: usize,
}

/// Build the entity set from passed-filter filing records.
///
/// Entities without a single Application filing are retained for
/// context-linking but flagged in the stats; the enrichable population is
/// `Entity::is_applicant`. Output is sorted by normalized name.
pub fn aggregate(records: Vec<FilingRecord>) -> (Vec<Entity>, AggregateStats) {
    let mut stats = AggregateStats {
        total_filings: records.len(),
        ..Default::default()
    };

    struct Cluster {
        resolved: Vec<ResolvedName>,
        filings: Vec<FilingRecord>,
    }

    let mut clusters: std::collections::BTreeMap<String, Cluster> = Default::default();

    for record in records {
        let resolved = resolve::resolve_name(&record);

        if resolved.candidate_name.is_empty() {
            stats.excluded_no_filer += 1;
            continue;
        }
        if resolve::is_government_entity(&resolved.candidate_name) {
            stats.excluded_government += 1;
            continue;
        }

        let key = normalize_name(&resolved.candidate_name);
        if key.is_empty() {
            stats.excluded_no_filer += 1;
            continue;
        }

        let cluster = clusters.entry(key).or_insert_with(|| Cluster {
            resolved: Vec::new(),
            filings: Vec::new(),
        });
        cluster.resolved.push(resolved);
        cluster.filings.push(record);
    }

    let mut entities = Vec::with_capacity(clusters.len());
    for (normalized_name, mut cluster) in clusters {
        cluster.filings.sort_by_key(|f| f.received_at);

        let name_variants: BTreeSet<String> = cluster
            .resolved
            .iter()
            .map(|r| r.candidate_name.clone())
            .collect();

        // Longest variant is the most formal spelling; ties break
        // alphabetically.
        let primary_name = name_variants
            .iter()
            .max_by(|a, b| a.len().cmp(&b.len()).then(b.cmp(a)))
            .cloned()
            .unwrap_or_else(|| normalized_name.clone());
        let (canonical_name, dba_name) = extract_dba(&primary_name);

        // Corporate evidence anywhere in the cluster outweighs a
        // person-shaped filing.
        let filer_type = if cluster
            .resolved
            .iter()
            .any(|r| r.filer_type == FilerType::Corporate)
        {
            FilerType::Corporate
        } else if cluster
            .resolved
            .iter()
            .any(|r| r.filer_type == FilerType::Individual)
        {
            FilerType::Individual
        } else {
            FilerType::Unknown
        };

        let first_filing_at = cluster.filings.first().map(|f| f.received_at);
        let last_filing_at = cluster.filings.last().map(|f| f.received_at);
        let (Some(first_filing_at), Some(last_filing_at)) = (first_filing_at, last_filing_at)
        else {
            continue;
        };

        let mut dockets = BTreeSet::new();
        let mut contact_names = BTreeSet::new();
        let mut law_firms = BTreeSet::new();
        let mut proceeding_descriptions = BTreeSet::new();
        let mut document_refs = Vec::new();
        let mut application_filings = Vec::new();
        let mut related_filings = Vec::new();

        for filing in cluster.filings {
            if !filing.docket_id.is_empty()
                && !EXCLUDED_DOCKETS.contains(&filing.docket_id.as_str())
            {
                dockets.insert(filing.docket_id.clone());
            }
            contact_names.extend(filing.author_names.iter().cloned());
            law_firms.extend(filing.law_firm_names.iter().cloned());
            if !filing.description_text.is_empty() {
                proceeding_descriptions.insert(filing.description_text.clone());
            }
            document_refs.extend(filing.document_refs.iter().cloned());

            if filing.submission_type == SubmissionType::Application {
                application_filings.push(filing);
            } else {
                related_filings.push(filing);
            }
        }

        if application_filings.is_empty() {
            stats.non_applicant_count += 1;
        }

        entities.push(Entity {
            entity_id: Entity::derive_id(&normalized_name),
            canonical_name,
            normalized_name,
            dba_name,
            name_variants,
            filer_type,
            dockets,
            first_filing_at,
            last_filing_at,
            application_filings,
            related_filings,
            document_refs,
            contact_names,
            law_firms,
            proceeding_descriptions,
            extracted_fields: None,
            filing_signals: None,
            enrichment: None,
        });
    }

    stats.entity_count = entities.len();
    debug!(
        filings = stats.total_filings,
        entities = stats.entity_count,
        excluded_government = stats.excluded_government,
        "aggregated filings into entities"
    );

    (entities, stats)
}
