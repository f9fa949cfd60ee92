//! Evidence extractor - structured fields from application document text.
//!
//! Application documents follow the section layout required by the
//! numbering-authorization rules, so extraction anchors on the labels
//! that layout guarantees ("Address:", "Telephone:", officer titles).
//! Every field is independent and best-effort; a missing anchor yields
//! `None` for that field only.

use chrono::Datelike;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::PipelineError;
use crate::traits::documents::{DocumentFetcher, TextExtractor};
use crate::types::entity::{Entity, ExtractedFields, Personnel};
use crate::types::report::{Degradation, FailureKind};

static ADDRESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)Address:\s*(.+?)(?:\n|City:|$)").unwrap());
static CITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)City:\s*(\w+)").unwrap());
static STATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)State:\s*(\w{2})").unwrap());
static ZIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ZIP\s*(?:Code)?:\s*(\d{5}(?:-\d{4})?)").unwrap());
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Telephone:\s*([\d\-\.\(\)\s]+)").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Email:\s*([\w\.\-]+@[\w\.\-]+\.\w+)").unwrap());

/// Personnel patterns, name-first and title-first variants.
static PERSONNEL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(
            r"(?:Name:|Contact:)\s*([A-Z][a-z]+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?),?\s*(President|CEO|CFO|CTO|COO|Chief\s+\w+\s+Officer)",
        )
        .unwrap(),
        Regex::new(r"(President|CEO|CFO|CTO|COO|Chief\s+\w+\s+Officer)[:\s]+([A-Z][a-z]+\s+[A-Z][a-z]+)")
            .unwrap(),
        Regex::new(
            r"([A-Z][a-z]+\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s+(?:is|as|serves as)\s+(?:the\s+)?(President|CEO|CFO|CTO)",
        )
        .unwrap(),
    ]
});

static FOUNDING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)(?:founded|established|incorporated|formed)\s+(?:in\s+)?(\d{4})").unwrap(),
        Regex::new(r"(?i)since\s+(\d{4})").unwrap(),
    ]
});

static SERVICE_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:provides?|offers?|delivers?)[^.]*(?:interconnected\s+VoIP|VoIP\s+services?)[^.]*\.")
        .unwrap()
});

const TITLE_WORDS: [&str; 5] = ["PRESIDENT", "CEO", "CFO", "CTO", "COO"];

/// Loose person-name check applied at extraction time: token count 2-4,
/// capitalized first character, no digits. The rule engine applies the
/// stricter denylist pass afterwards.
fn is_plausible_person(name: &str) -> bool {
    let name = name.trim();
    if name.len() < 3 || !name.chars().next().is_some_and(|c| c.is_uppercase()) {
        return false;
    }
    if name.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let words = name.split_whitespace().count();
    (2..=4).contains(&words)
}

/// Parse one document's text into structured fields.
pub fn parse_document_text(text: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::default();
    if text.is_empty() {
        return fields;
    }

    fields.address = ADDRESS
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());
    fields.city = CITY
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());
    fields.state = STATE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_uppercase());
    fields.zip_code = ZIP
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    if let Some(raw_phone) = PHONE.captures(text).and_then(|c| c.get(1)) {
        let digits: String = raw_phone
            .as_str()
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.len() >= 10 {
            fields.phone = Some(digits[..10].to_string());
        }
    }

    fields.email = EMAIL
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    let mut seen: HashSet<String> = HashSet::new();
    for pattern in PERSONNEL_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            let (Some(a), Some(b)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            // Either group may be the title depending on the pattern.
            let (name, title) = if TITLE_WORDS.contains(&a.as_str().to_uppercase().as_str())
                || a.as_str().to_uppercase().starts_with("CHIEF")
            {
                (b.as_str().trim(), a.as_str().trim())
            } else {
                (a.as_str().trim(), b.as_str().trim())
            };

            if !is_plausible_person(name) {
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                fields
                    .personnel
                    .push(Personnel::new(name).with_title(title));
            }
        }
    }

    let current_year = chrono::Utc::now().year() as u16;
    'founding: for pattern in FOUNDING_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(year) = captures.get(1).and_then(|m| m.as_str().parse::<u16>().ok()) {
                if (1900..=current_year).contains(&year) {
                    fields.founding_year = Some(year);
                    break 'founding;
                }
            }
        }
    }

    fields.service_description = SERVICE_DESCRIPTION
        .find(text)
        .map(|m| m.as_str().trim().to_string());

    fields
}

/// Merge fields parsed from a later document into the accumulated set.
/// First non-null value wins per field; personnel union, deduplicated.
pub fn merge_fields(into: &mut ExtractedFields, from: ExtractedFields) {
    into.address = into.address.take().or(from.address);
    into.city = into.city.take().or(from.city);
    into.state = into.state.take().or(from.state);
    into.zip_code = into.zip_code.take().or(from.zip_code);
    into.phone = into.phone.take().or(from.phone);
    into.email = into.email.take().or(from.email);
    into.founding_year = into.founding_year.take().or(from.founding_year);
    into.service_description = into
        .service_description
        .take()
        .or(from.service_description);

    let seen: HashSet<String> = into
        .personnel
        .iter()
        .map(|p| p.name.to_lowercase())
        .collect();
    for person in from.personnel {
        if !seen.contains(&person.name.to_lowercase()) {
            into.personnel.push(person);
        }
    }
}

/// Fetch and parse every document for one entity, filling
/// `extracted_fields` in place.
///
/// Per-document fetch and extraction failures degrade that document only;
/// the entity keeps whatever the remaining documents yielded.
pub async fn extract_entity_evidence<F, X>(
    entity: &mut Entity,
    fetcher: &F,
    extractor: &X,
) -> Vec<Degradation>
where
    F: DocumentFetcher,
    X: TextExtractor,
{
    let mut fields = ExtractedFields::default();
    let mut degradations = Vec::new();

    for doc in &entity.document_refs {
        let bytes = match fetcher.fetch(doc).await {
            Ok(bytes) => bytes,
            Err(err) => {
                degradations.push(Degradation::new(
                    FailureKind::FetchFailed,
                    &entity.entity_id,
                    format!("{}: {err}", doc.filename),
                ));
                continue;
            }
        };

        let text = match extractor.extract_text(&bytes, &doc.filename) {
            Ok(text) => text,
            Err(PipelineError::ExtractionFailed { filename }) => {
                degradations.push(Degradation::new(
                    FailureKind::ExtractionFailed,
                    &entity.entity_id,
                    filename,
                ));
                continue;
            }
            Err(err) => {
                degradations.push(Degradation::new(
                    FailureKind::ExtractionFailed,
                    &entity.entity_id,
                    format!("{}: {err}", doc.filename),
                ));
                continue;
            }
        };

        merge_fields(&mut fields, parse_document_text(&text));
    }

    debug!(
        entity = %entity.entity_id,
        documents = entity.document_refs.len(),
        degraded = degradations.len(),
        empty = fields.is_empty(),
        "extracted document evidence"
    );

    entity.extracted_fields = Some(fields);
    degradations
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Pursuant to Section 52.15(g)(3)(i)(A) of the Commission's rules:\n\
Name: Jane Smith, President\n\
Address: 100 Main Street Suite 200\n\
City: Austin\n\
State: TX\n\
ZIP Code: 78701\n\
Telephone: (512) 555-0100\n\
Email: jane.smith@ulec.example.com\n\
ULEC was founded in 2019 and provides interconnected VoIP services to business customers.";

    #[test]
    fn test_parses_anchored_contact_fields() {
        let fields = parse_document_text(SAMPLE);
        assert_eq!(fields.address.as_deref(), Some("100 Main Street Suite 200"));
        assert_eq!(fields.city.as_deref(), Some("Austin"));
        assert_eq!(fields.state.as_deref(), Some("TX"));
        assert_eq!(fields.zip_code.as_deref(), Some("78701"));
        assert_eq!(fields.phone.as_deref(), Some("5125550100"));
        assert_eq!(fields.email.as_deref(), Some("jane.smith@ulec.example.com"));
    }

    #[test]
    fn test_parses_personnel_and_founding() {
        let fields = parse_document_text(SAMPLE);
        assert_eq!(fields.personnel.len(), 1);
        assert_eq!(fields.personnel[0].name, "Jane Smith");
        assert_eq!(fields.personnel[0].title.as_deref(), Some("President"));
        assert_eq!(fields.founding_year, Some(2019));
    }

    #[test]
    fn test_parses_service_description() {
        let fields = parse_document_text(SAMPLE);
        let desc = fields.service_description.unwrap();
        assert!(desc.contains("interconnected VoIP"));
        assert!(desc.ends_with('.'));
    }

    #[test]
    fn test_missing_anchors_yield_none() {
        let fields = parse_document_text("No structured sections in this text at all.");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_implausible_founding_year_rejected() {
        let fields = parse_document_text("The company was founded in 1850.");
        assert_eq!(fields.founding_year, None);
    }

    #[test]
    fn test_short_phone_rejected() {
        let fields = parse_document_text("Telephone: 555-0100");
        assert_eq!(fields.phone, None);
    }

    #[test]
    fn test_merge_first_value_wins() {
        let mut a = parse_document_text("City: Austin");
        let b = parse_document_text("City: Dallas\nState: TX");
        merge_fields(&mut a, b);
        assert_eq!(a.city.as_deref(), Some("Austin"));
        assert_eq!(a.state.as_deref(), Some("TX"));
    }

    #[test]
    fn test_personnel_deduplicated_case_insensitively() {
        let mut a = ExtractedFields::default();
        a.personnel.push(Personnel::new("Jane Smith"));
        let mut b = ExtractedFields::default();
        b.personnel.push(Personnel::new("JANE SMITH"));
        b.personnel.push(Personnel::new("Bob Jones"));
        merge_fields(&mut a, b);
        assert_eq!(a.personnel.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_document_only() {
        use crate::traits::documents::{MockDocumentFetcher, PlainTextExtractor};
        use crate::types::filing::DocumentRef;
        use chrono::Utc;

        let mut entity = test_entity();
        entity.document_refs = vec![
            DocumentRef {
                filename: "broken.pdf".to_string(),
                locator: "https://www.fcc.gov/ecfs/document/1/1".to_string(),
                submission_id: "1".to_string(),
                filed_at: Utc::now(),
            },
            DocumentRef {
                filename: "good.txt".to_string(),
                locator: "https://www.fcc.gov/ecfs/document/1/2".to_string(),
                submission_id: "1".to_string(),
                filed_at: Utc::now(),
            },
        ];

        let fetcher = MockDocumentFetcher::new()
            .with_failure("https://www.fcc.gov/ecfs/document/1/1")
            .with_text("https://www.fcc.gov/ecfs/document/1/2", "City: Austin");

        let degradations =
            extract_entity_evidence(&mut entity, &fetcher, &PlainTextExtractor).await;

        assert_eq!(degradations.len(), 1);
        assert_eq!(degradations[0].kind, FailureKind::FetchFailed);
        let fields = entity.extracted_fields.unwrap();
        assert_eq!(fields.city.as_deref(), Some("Austin"));
    }

    fn test_entity() -> Entity {
        use chrono::Utc;
        use std::collections::BTreeSet;

        Entity {
            entity_id: Entity::derive_id("ulec"),
            canonical_name: "ULEC, LLC".to_string(),
            normalized_name: "ulec".to_string(),
            dba_name: None,
            name_variants: BTreeSet::new(),
            filer_type: crate::types::entity::FilerType::Corporate,
            dockets: BTreeSet::new(),
            first_filing_at: Utc::now(),
            last_filing_at: Utc::now(),
            application_filings: vec![],
            related_filings: vec![],
            document_refs: vec![],
            contact_names: BTreeSet::new(),
            law_firms: BTreeSet::new(),
            proceeding_descriptions: BTreeSet::new(),
            extracted_fields: None,
            filing_signals: None,
            enrichment: None,
        }
    }
}
