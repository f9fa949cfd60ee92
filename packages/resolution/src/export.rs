//! Flat tabular export of the enriched entity set, for human review.

use std::io::Write;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::types::entity::Entity;

const HEADER: [&str; 25] = [
    "entity_id",
    "company_name",
    "company_name_normalized",
    "dba_name",
    "filer_type",
    "first_filing_date",
    "latest_filing_date",
    "total_filing_count",
    "application_count",
    "docket_numbers",
    "is_active",
    "activity_signal",
    "industry_segment",
    "product_summary",
    "market_position",
    "provenance",
    "rule_reason",
    "enrichment_confidence",
    "address",
    "city",
    "state",
    "zip_code",
    "phone",
    "email",
    "key_personnel_count",
];

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(entity: &Entity) -> Vec<String> {
    let enrichment = entity.enrichment.as_ref();
    let fields = entity.extracted_fields.as_ref();

    let opt = |v: Option<&str>| v.unwrap_or_default().to_string();

    vec![
        entity.entity_id.clone(),
        entity.canonical_name.clone(),
        entity.normalized_name.clone(),
        opt(entity.dba_name.as_deref()),
        format!("{:?}", entity.filer_type),
        entity.first_filing_at.format("%Y-%m-%d").to_string(),
        entity.last_filing_at.format("%Y-%m-%d").to_string(),
        entity.filing_count().to_string(),
        entity.application_filings.len().to_string(),
        entity
            .dockets
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("; "),
        enrichment
            .map(|e| format!("{:?}", e.is_active))
            .unwrap_or_default(),
        opt(enrichment.and_then(|e| e.activity_signal.as_deref())),
        enrichment
            .map(|e| e.industry_segment.label().to_string())
            .unwrap_or_default(),
        opt(enrichment.and_then(|e| e.product_summary.as_deref())),
        enrichment
            .map(|e| e.market_position.label().to_string())
            .unwrap_or_default(),
        enrichment
            .map(|e| format!("{:?}", e.provenance))
            .unwrap_or_default(),
        opt(enrichment.and_then(|e| e.rule_reason.as_deref())),
        enrichment
            .map(|e| format!("{:?}", e.confidence))
            .unwrap_or_default(),
        opt(fields.and_then(|f| f.address.as_deref())),
        opt(fields.and_then(|f| f.city.as_deref())),
        opt(fields.and_then(|f| f.state.as_deref())),
        opt(fields.and_then(|f| f.zip_code.as_deref())),
        opt(fields.and_then(|f| f.phone.as_deref())),
        opt(fields.and_then(|f| f.email.as_deref())),
        fields
            .map(|f| f.personnel.len().to_string())
            .unwrap_or_else(|| "0".to_string()),
    ]
}

/// Render the entity set as CSV.
pub fn to_csv(entities: &[Entity]) -> String {
    let mut out = String::new();
    out.push_str(&HEADER.join(","));
    out.push('\n');
    for entity in entities {
        let fields: Vec<String> = row(entity).iter().map(|f| csv_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Write the CSV export to a file.
pub fn write_csv(entities: &[Entity], path: impl AsRef<Path>) -> Result<()> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| PipelineError::Storage(Box::new(e)))?;
    file.write_all(to_csv(entities).as_bytes())
        .map_err(|e| PipelineError::Storage(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::enrichment::{
        IndustrySegment, MarketPosition, Provenance, StructuredEnrichment,
    };
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn entity() -> Entity {
        let mut enrichment = StructuredEnrichment::undetermined();
        enrichment.industry_segment = IndustrySegment::CPaaS;
        enrichment.market_position = MarketPosition::Smb;
        enrichment.provenance = Provenance::Rules;
        enrichment.product_summary = Some("Numbering, \"wholesale\" VoIP".to_string());

        Entity {
            entity_id: Entity::derive_id("ulec"),
            canonical_name: "ULEC, LLC".to_string(),
            normalized_name: "ulec".to_string(),
            dba_name: None,
            name_variants: BTreeSet::new(),
            filer_type: crate::types::entity::FilerType::Corporate,
            dockets: ["24-0100".to_string()].into_iter().collect(),
            first_filing_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            last_filing_at: Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
            application_filings: vec![],
            related_filings: vec![],
            document_refs: vec![],
            contact_names: BTreeSet::new(),
            law_firms: BTreeSet::new(),
            proceeding_descriptions: BTreeSet::new(),
            extracted_fields: None,
            filing_signals: None,
            enrichment: Some(enrichment),
        }
    }

    #[test]
    fn test_header_and_field_counts_match() {
        let csv = to_csv(&[entity()]);
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.split(',').count(), HEADER.len());
        assert!(header.starts_with("entity_id,company_name"));
    }

    #[test]
    fn test_fields_with_commas_and_quotes_escaped() {
        let csv = to_csv(&[entity()]);
        assert!(csv.contains("\"ULEC, LLC\""));
        assert!(csv.contains("\"Numbering, \"\"wholesale\"\" VoIP\""));
    }

    #[test]
    fn test_dates_and_categoricals_rendered() {
        let csv = to_csv(&[entity()]);
        assert!(csv.contains("2024-03-01"));
        assert!(csv.contains("2024-03-05"));
        assert!(csv.contains("CPaaS"));
        assert!(csv.contains("SMB"));
        assert!(csv.contains("Rules"));
    }
}
