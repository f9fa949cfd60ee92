//! Post-fusion rule engine - deterministic second pass, no external calls.
//!
//! Three phases, each auditable:
//! 1. Name correction: person-named entities whose filings reveal the real
//!    company behind them get their canonical name rewritten.
//! 2. Personnel re-filter: the strict denylist pass over extracted
//!    personnel.
//! 3. Categorical fill: a priority-ordered rule table fills unknown market
//!    positions from other signals.
//!
//! Every overwrite produces a [`Correction`] record. Synthesized
//! enrichment is never downgraded: the fill rules only touch entities
//! whose provenance is still undetermined.

use tracing::{debug, info};

use crate::pipeline::resolve::extract_filed_by;
use crate::types::entity::{Entity, FilerType};
use crate::types::enrichment::{IndustrySegment, MarketPosition, Provenance};
use crate::types::report::Correction;

/// Role titles, sentence fragments, and parse artifacts that disqualify a
/// personnel candidate.
const PERSONNEL_NOISE_WORDS: [&str; 31] = [
    "company",
    "website",
    "experience",
    "brings",
    "chief",
    "officer",
    "president",
    "director",
    "ceo",
    "cto",
    "coo",
    "cfo",
    "and",
    "the",
    "see exhibit",
    "of vm",
    "since",
    "has",
    "was",
    "from",
    "its",
    "contact name",
    "strategic",
    "technical",
    "management",
    "operations",
    "executive",
    "senior",
    "vice",
    "provide",
    "business",
];

/// Organizational tokens that mark a candidate as a company, not a person.
const COMPANY_INDICATORS: [&str; 10] = [
    "llc",
    "inc",
    "corp",
    "communications",
    "networks",
    "solutions",
    "technologies",
    "telecom",
    "services",
    "wireless",
];

/// Strict person-name validation used by the re-filter phase.
pub fn is_valid_person_name(name: &str) -> bool {
    let name = name.trim();
    if name.len() < 3 {
        return false;
    }
    if name.contains('\n') || name.contains('\t') {
        return false;
    }

    let lower = name.to_lowercase();
    if PERSONNEL_NOISE_WORDS.iter().any(|kw| {
        // Whole-word match for short noise tokens, substring for phrases.
        if kw.contains(' ') {
            lower.contains(kw)
        } else {
            lower.split_whitespace().any(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric()) == *kw
            })
        }
    }) {
        return false;
    }
    if COMPANY_INDICATORS.iter().any(|ci| lower.contains(ci)) {
        return false;
    }

    let words = name.split_whitespace().count();
    if !(2..=4).contains(&words) {
        return false;
    }

    name.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Filter a personnel name list with the strict ruleset, deduplicating
/// case-insensitively.
pub fn filter_personnel_names(names: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .filter(|n| is_valid_person_name(n))
        .filter(|n| seen.insert(n.trim().to_lowercase()))
        .map(|n| n.trim().to_string())
        .collect()
}

/// Apply all rule-engine phases to one entity. Returns the corrections
/// made, in application order.
pub fn apply_rules(entity: &mut Entity) -> Vec<Correction> {
    let mut corrections = Vec::new();
    correct_name(entity, &mut corrections);
    refilter_personnel(entity, &mut corrections);
    fill_market_position(entity, &mut corrections);
    corrections
}

/// Apply the rule engine across the entity set.
pub fn apply_rules_all(entities: &mut [Entity]) -> Vec<Correction> {
    let mut corrections = Vec::new();
    for entity in entities.iter_mut() {
        corrections.extend(apply_rules(entity));
    }
    info!(
        entities = entities.len(),
        corrections = corrections.len(),
        "rule engine pass complete"
    );
    corrections
}

/// Phase 1: re-scan filing text for a company name behind a person-named
/// entity. Entities with no extractable pattern remain Individual,
/// explicit and final.
fn correct_name(entity: &mut Entity, corrections: &mut Vec<Correction>) {
    if entity.filer_type == FilerType::Corporate {
        return;
    }

    let texts = entity
        .proceeding_descriptions
        .iter()
        .map(|s| s.as_str())
        .chain(entity.all_filings().map(|f| f.description_text.as_str()));

    let Some(extracted) = texts
        .map(extract_filed_by)
        .find_map(|candidate| candidate)
        .filter(|name| !name.eq_ignore_ascii_case(&entity.canonical_name))
    else {
        return;
    };

    let old_name = std::mem::replace(&mut entity.canonical_name, extracted.clone());
    entity.name_variants.insert(old_name.clone());
    entity.filer_type = FilerType::Corporate;

    debug!(entity = %entity.entity_id, %old_name, new_name = %extracted, "corrected entity name");
    corrections.push(Correction::new(
        &entity.entity_id,
        "canonical_name",
        old_name,
        extracted,
        "name-correction/filed-by",
    ));
}

/// Phase 2: strict personnel re-filter.
fn refilter_personnel(entity: &mut Entity, corrections: &mut Vec<Correction>) {
    let Some(fields) = entity.extracted_fields.as_mut() else {
        return;
    };
    if fields.personnel.is_empty() {
        return;
    }

    let before: Vec<String> = fields.personnel.iter().map(|p| p.name.clone()).collect();

    let mut seen = std::collections::HashSet::new();
    fields
        .personnel
        .retain(|p| is_valid_person_name(&p.name) && seen.insert(p.name.trim().to_lowercase()));

    if fields.personnel.len() != before.len() {
        let after: Vec<String> = fields.personnel.iter().map(|p| p.name.clone()).collect();
        corrections.push(Correction::new(
            &entity.entity_id,
            "personnel",
            before.join("; "),
            after.join("; "),
            "personnel-refilter/strict",
        ));
    }
}

/// Phase 3: priority-ordered market-position fill. First matching rule
/// wins; no rule firing leaves the entity undetermined.
fn fill_market_position(entity: &mut Entity, corrections: &mut Vec<Correction>) {
    let founding_year = entity
        .extracted_fields
        .as_ref()
        .and_then(|f| f.founding_year);
    let signals = entity.filing_signals.clone();

    let Some(enrichment) = entity.enrichment.as_mut() else {
        return;
    };
    if enrichment.market_position != MarketPosition::Unknown {
        return;
    }
    // Synthesized output wins when present; rules never downgrade it.
    if enrichment.provenance == Provenance::Synthesized {
        return;
    }

    let fired: Option<(MarketPosition, String)> =
        if enrichment.industry_segment == IndustrySegment::EnterpriseIt {
            Some((
                MarketPosition::Enterprise,
                "industry_segment=Enterprise IT".to_string(),
            ))
        } else if let Some(year) = founding_year.filter(|y| *y >= 2022) {
            Some((MarketPosition::Startup, format!("founded {year}")))
        } else if let Some(s) = signals
            .as_ref()
            .filter(|s| s.total_filings > 5 && s.recent_activity)
        {
            Some((
                MarketPosition::MidMarket,
                format!("total_filings={}, recent_activity", s.total_filings),
            ))
        } else if matches!(
            enrichment.industry_segment,
            IndustrySegment::UCaaS | IndustrySegment::CCaaS | IndustrySegment::CPaaS
        ) {
            Some((
                MarketPosition::Smb,
                format!("industry_segment={}", enrichment.industry_segment.label()),
            ))
        } else {
            None
        };

    let Some((position, reason)) = fired else {
        return;
    };

    enrichment.market_position = position;
    enrichment.provenance = Provenance::Rules;
    enrichment.rule_reason = Some(reason.clone());

    corrections.push(Correction::new(
        &entity.entity_id,
        "market_position",
        MarketPosition::Unknown.label(),
        position.label(),
        format!("market-fill/{reason}"),
    ));
}
