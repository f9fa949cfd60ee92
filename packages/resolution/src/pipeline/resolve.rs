//! Name resolver - best-effort company name extraction from filing text.
//!
//! An ordered rule list with first-match-wins semantics. Each rule is a
//! pure text inspection; absence of a match is a normal outcome, never an
//! error, and malformed text falls through to the verbatim fallback.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::entity::FilerType;
use crate::types::filing::FilingRecord;

/// "... Filed By ULEC, LLC Pursuant To ..." is the canonical proceeding
/// description shape. The company name runs up to the comma before
/// "pursuant", keeping an organizational suffix when one is attached.
static FILED_BY_PURSUANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)filed\s+by\s+([^,]+?(?:,?\s*(?:LLC|INC|CORP|L\.?L\.?C\.?|INC\.?|CORP\.?|CORPORATION|COMPANY|CO\.?))?)[\s,]+pursuant",
    )
    .unwrap()
});

/// Fallback when "Pursuant" is absent: capture through the next delimiter.
static FILED_BY_LOOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)filed\s+by\s+([^|;]+?)(?:\s*[|;]|\s*$)").unwrap());

/// "In the Matter of X For Authorization ..." shape used by some dockets.
static IN_THE_MATTER_OF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)in\s+the\s+matter\s+of\s+(.+?)(?:\s+for\s+|\s*,\s*|\s*[|;]|\s*$)").unwrap()
});

/// Filer names containing any of these are regulators, not companies.
const GOVERNMENT_KEYWORDS: [&str; 5] = [
    "wireline competition bureau",
    "federal communications commission",
    "fcc",
    "u.s. department",
    "department of justice",
];

/// Substrings that mark a name as organizational rather than personal.
const COMPANY_INDICATORS: [&str; 18] = [
    "llc",
    "inc",
    "corp",
    "ltd",
    "company",
    "co.",
    "technologies",
    "communications",
    "networks",
    "services",
    "tel",
    "voip",
    "solutions",
    "wireless",
    "telecom",
    "broadband",
    "digital",
    "media",
];

/// Resolution result: the candidate name and how the filer was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub candidate_name: String,
    pub filer_type: FilerType,
}

/// Whether a filer name belongs to a regulator or agency.
pub fn is_government_entity(name: &str) -> bool {
    let lower = name.to_lowercase();
    GOVERNMENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Whether a string lexically resembles a person's name rather than an
/// organization: two to four capitalized tokens, no digits, no
/// organizational keyword.
pub fn looks_like_person_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    let lower = name.to_lowercase();
    if COMPANY_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return false;
    }

    let words: Vec<&str> = name.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }
    if name.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    words.iter().filter(|w| w.len() > 1).all(|w| {
        w.trim_matches(|c| c == '(' || c == ')')
            .chars()
            .next()
            .is_some_and(|c| c.is_uppercase())
    })
}

/// Extract a company name from free proceeding text using the primary
/// pattern tier. Used both at initial resolution and by the rule engine's
/// second-pass name correction.
pub fn extract_filed_by(text: &str) -> Option<String> {
    FILED_BY_PURSUANT
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the best-effort `(candidateName, filerType)` for a filing.
///
/// Ordered rules, first match wins:
/// 1. "Filed By X Pursuant" in the description (loose "Filed By X"
///    fallback when "Pursuant" is absent) => Corporate.
/// 2. "In the Matter of X [For ...]" => Corporate.
/// 3. First non-government filer; person-shaped names => Individual.
/// 4. Verbatim first filer, Unknown.
pub fn resolve_name(record: &FilingRecord) -> ResolvedName {
    if let Some(name) = extract_filed_by(&record.description_text) {
        return ResolvedName {
            candidate_name: name,
            filer_type: FilerType::Corporate,
        };
    }

    if record.description_text.to_lowercase().contains("filed by") {
        if let Some(captures) = FILED_BY_LOOSE.captures(&record.description_text) {
            if let Some(name) = captures.get(1).map(|m| m.as_str().trim()) {
                if !name.is_empty() {
                    return ResolvedName {
                        candidate_name: name.to_string(),
                        filer_type: FilerType::Corporate,
                    };
                }
            }
        }
    }

    if let Some(captures) = IN_THE_MATTER_OF.captures(&record.description_text) {
        if let Some(name) = captures.get(1).map(|m| m.as_str().trim()) {
            if !name.is_empty() {
                return ResolvedName {
                    candidate_name: name.to_string(),
                    filer_type: FilerType::Corporate,
                };
            }
        }
    }

    if let Some(filer) = record
        .filers
        .iter()
        .find(|f| !is_government_entity(f))
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
    {
        let filer_type = if looks_like_person_name(filer) {
            FilerType::Individual
        } else {
            FilerType::Corporate
        };
        return ResolvedName {
            candidate_name: filer.to_string(),
            filer_type,
        };
    }

    ResolvedName {
        candidate_name: record.primary_filer().unwrap_or_default().to_string(),
        filer_type: FilerType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::types::filing::SubmissionType;

    fn record(description: &str, filers: &[&str]) -> FilingRecord {
        FilingRecord {
            submission_id: "1".to_string(),
            received_at: Utc::now(),
            submission_type: SubmissionType::Application,
            docket_id: "24-0100".to_string(),
            description_text: description.to_string(),
            filers: filers.iter().map(|s| s.to_string()).collect(),
            author_names: vec![],
            law_firm_names: vec![],
            document_refs: vec![],
            status: None,
        }
    }

    #[test]
    fn test_filed_by_pursuant_extraction() {
        let r = record(
            "Interconnected VoIP Numbering Authorization Application Filed By ULEC, LLC Pursuant To Section 52.15(g)(3)",
            &["Someone Else"],
        );
        let resolved = resolve_name(&r);
        assert_eq!(resolved.candidate_name, "ULEC, LLC");
        assert_eq!(resolved.filer_type, FilerType::Corporate);
    }

    #[test]
    fn test_filed_by_without_pursuant_falls_back() {
        let r = record(
            "Numbering Authorization Application Filed By Mix Networks",
            &[],
        );
        let resolved = resolve_name(&r);
        assert_eq!(resolved.candidate_name, "Mix Networks");
        assert_eq!(resolved.filer_type, FilerType::Corporate);
    }

    #[test]
    fn test_in_the_matter_of_extraction() {
        let r = record(
            "In the Matter of Telnyx LLC For Authorization to Obtain Numbering Resources",
            &[],
        );
        let resolved = resolve_name(&r);
        assert_eq!(resolved.candidate_name, "Telnyx LLC");
        assert_eq!(resolved.filer_type, FilerType::Corporate);
    }

    #[test]
    fn test_person_shaped_filer_is_individual() {
        let r = record("Supplement to pending application", &["Jane A. Smith"]);
        let resolved = resolve_name(&r);
        assert_eq!(resolved.candidate_name, "Jane A. Smith");
        assert_eq!(resolved.filer_type, FilerType::Individual);
    }

    #[test]
    fn test_government_filers_are_skipped() {
        let r = record(
            "Public notice",
            &["Wireline Competition Bureau", "Acme Telecom LLC"],
        );
        let resolved = resolve_name(&r);
        assert_eq!(resolved.candidate_name, "Acme Telecom LLC");
        assert_eq!(resolved.filer_type, FilerType::Corporate);
    }

    #[test]
    fn test_no_candidate_is_unknown() {
        let r = record("Supplement", &[]);
        let resolved = resolve_name(&r);
        assert_eq!(resolved.candidate_name, "");
        assert_eq!(resolved.filer_type, FilerType::Unknown);
    }

    #[test]
    fn test_person_heuristic_rejects_org_keywords_and_digits() {
        assert!(looks_like_person_name("Jane A. Smith"));
        assert!(!looks_like_person_name("Acme Communications"));
        assert!(!looks_like_person_name("Agent 47"));
        assert!(!looks_like_person_name("Jane"));
        assert!(!looks_like_person_name(
            "A Very Long Name With Too Many Words"
        ));
    }

    #[test]
    fn test_extraction_never_panics_on_garbage() {
        let r = record("filed by ", &[]);
        let resolved = resolve_name(&r);
        assert_eq!(resolved.filer_type, FilerType::Unknown);
    }
}
