//! Signal deriver stage - fills `filing_signals` across the entity set.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::types::entity::Entity;
use crate::types::signals::FilingSignals;

/// Derive filing signals for every entity in place.
///
/// Pure over the aggregated fields; idempotent except for
/// `recent_activity`, which depends on `now`.
pub fn derive_signals(entities: &mut [Entity], now: DateTime<Utc>, recency_window: Duration) {
    for entity in entities.iter_mut() {
        entity.filing_signals = Some(FilingSignals::derive(entity, now, recency_window));
    }
    debug!(entities = entities.len(), "derived filing signals");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::filing::{FilingRecord, SubmissionType};
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn filing(id: &str, day: u32, kind: SubmissionType) -> FilingRecord {
        FilingRecord {
            submission_id: id.to_string(),
            received_at: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
            submission_type: kind,
            docket_id: "24-0100".to_string(),
            description_text: String::new(),
            filers: vec![],
            author_names: vec![],
            law_firm_names: vec![],
            document_refs: vec![],
            status: None,
        }
    }

    fn entity() -> Entity {
        Entity {
            entity_id: Entity::derive_id("ulec"),
            canonical_name: "ULEC, LLC".to_string(),
            normalized_name: "ulec".to_string(),
            dba_name: None,
            name_variants: BTreeSet::new(),
            filer_type: crate::types::entity::FilerType::Corporate,
            dockets: ["24-0100".to_string()].into_iter().collect(),
            first_filing_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            last_filing_at: Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap(),
            application_filings: vec![filing("1", 1, SubmissionType::Application)],
            related_filings: vec![filing("2", 10, SubmissionType::Supplement)],
            document_refs: vec![],
            contact_names: BTreeSet::new(),
            law_firms: BTreeSet::new(),
            proceeding_descriptions: BTreeSet::new(),
            extracted_fields: None,
            filing_signals: None,
            enrichment: None,
        }
    }

    #[test]
    fn test_signal_derivation() {
        let mut entities = vec![entity()];
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        derive_signals(&mut entities, now, Duration::days(730));

        let signals = entities[0].filing_signals.as_ref().unwrap();
        assert_eq!(signals.total_filings, 2);
        assert_eq!(signals.application_count, 1);
        assert!(signals.has_supplements);
        assert!(!signals.has_amendments);
        assert_eq!(signals.docket_count, 1);
        assert!(signals.recent_activity);
    }

    #[test]
    fn test_recency_depends_on_run_time() {
        let mut entities = vec![entity()];
        let later = Utc.with_ymd_and_hms(2027, 6, 1, 0, 0, 0).unwrap();
        derive_signals(&mut entities, later, Duration::days(730));
        assert!(!entities[0].filing_signals.as_ref().unwrap().recent_activity);
    }

    #[test]
    fn test_rederivation_is_stable() {
        let mut entities = vec![entity()];
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        derive_signals(&mut entities, now, Duration::days(730));
        let first = entities[0].filing_signals.clone();
        derive_signals(&mut entities, now, Duration::days(730));
        assert_eq!(first, entities[0].filing_signals);
    }
}
